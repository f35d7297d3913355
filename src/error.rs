pub type PixelpressResult<T> = Result<T, PixelpressError>;

#[derive(thiserror::Error, Debug)]
pub enum PixelpressError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported input format: {0}")]
    UnsupportedInputFormat(String),

    #[error("unsupported output format: {0}")]
    UnsupportedOutputFormat(String),

    #[error("write access error: {0}")]
    WriteAccess(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PixelpressError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unsupported_input(msg: impl Into<String>) -> Self {
        Self::UnsupportedInputFormat(msg.into())
    }

    pub fn unsupported_output(msg: impl Into<String>) -> Self {
        Self::UnsupportedOutputFormat(msg.into())
    }

    pub fn write_access(msg: impl Into<String>) -> Self {
        Self::WriteAccess(msg.into())
    }
}
