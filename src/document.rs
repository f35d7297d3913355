use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::canvas::{Canvas, OutputFormat};
use crate::error::{PixelpressError, PixelpressResult};

/// Source format tag of a loaded document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Jpg,
    Png,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn output_format(self) -> OutputFormat {
        match self {
            Self::Gif => OutputFormat::Gif,
            Self::Jpg => OutputFormat::Jpeg,
            Self::Png => OutputFormat::Png,
        }
    }

    fn classify(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Jpeg => Some(Self::Jpg),
            ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }
}

/// A loaded raster document: one live canvas, its source format, and the
/// origin it can be reloaded from.
///
/// Remotely fetched sources are copied to a process-temporary file owned by
/// the document; the copy is deleted when the document is dropped, on every
/// exit path. Caller-supplied local files are never deleted.
pub struct ImageDocument {
    canvas: Canvas,
    kind: ImageKind,
    origin: PathBuf,
    #[allow(dead_code)]
    temp: Option<tempfile::NamedTempFile>,
}

impl ImageDocument {
    /// Open a local image file.
    pub fn open(path: impl AsRef<Path>) -> PixelpressResult<Self> {
        let path = path.as_ref();
        let (canvas, kind) = load_from_path(path)?;
        Ok(Self {
            canvas,
            kind,
            origin: path.to_path_buf(),
            temp: None,
        })
    }

    /// Fetch a remote image to a temporary file and open it.
    #[cfg(feature = "remote")]
    pub fn open_remote(url: &str) -> PixelpressResult<Self> {
        use std::io::Write as _;

        let resp = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| anyhow::anyhow!("fetch of '{url}' failed: {e}"))?;
        let bytes = resp
            .bytes()
            .map_err(|e| anyhow::anyhow!("read of '{url}' failed: {e}"))?;

        let mut temp = tempfile::NamedTempFile::new()?;
        temp.write_all(&bytes)?;
        temp.flush()?;

        let (canvas, kind) = load_from_path(temp.path())?;
        tracing::debug!(url, path = %temp.path().display(), "fetched remote source");
        Ok(Self {
            canvas,
            kind,
            origin: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    /// Fetch a remote image to a temporary file and open it.
    ///
    /// Returns an error when the `remote` feature is disabled.
    #[cfg(not(feature = "remote"))]
    pub fn open_remote(_url: &str) -> PixelpressResult<Self> {
        Err(PixelpressError::validation(
            "remote sources require the 'remote' feature",
        ))
    }

    /// Open `source` as a local file when one exists at that path, falling
    /// back to a remote fetch.
    pub fn open_source(source: &str) -> PixelpressResult<Self> {
        let path = Path::new(source);
        if path.is_file() {
            Self::open(path)
        } else {
            Self::open_remote(source)
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Swap in a new canvas, releasing the previous one.
    pub fn replace_canvas(&mut self, canvas: Canvas) {
        self.canvas = canvas;
    }

    /// Reload the original source, discarding all canvas mutations.
    pub fn reset(&mut self) -> PixelpressResult<()> {
        let (canvas, kind) = load_from_path(&self.origin)?;
        self.canvas = canvas;
        self.kind = kind;
        Ok(())
    }

    /// Encode the current canvas, defaulting to the source format.
    ///
    /// Returns the content type alongside the bytes.
    pub fn encode(
        &self,
        format: Option<OutputFormat>,
        quality: Option<u8>,
    ) -> PixelpressResult<(&'static str, Vec<u8>)> {
        let format = format.unwrap_or_else(|| self.kind.output_format());
        let bytes = self.canvas.encode(format, quality)?;
        Ok((format.content_type(), bytes))
    }

    /// Write the current canvas to `path`, inferring the format from the
    /// file extension and creating missing directories along the way.
    pub fn save_as(&self, path: impl AsRef<Path>, quality: Option<u8>) -> PixelpressResult<()> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                PixelpressError::unsupported_output(format!(
                    "'{}' has no format extension",
                    path.display()
                ))
            })?;
        let format = OutputFormat::parse(ext)?;

        if let Some(parent) = path.parent() {
            create_dir_path(parent, SAVE_DIR_MODE)?;
        }

        if path.exists() {
            let meta = fs::metadata(path)?;
            if meta.permissions().readonly() {
                return Err(PixelpressError::write_access(format!(
                    "'{}' is not writable",
                    path.display()
                )));
            }
        }

        let bytes = self.canvas.encode(format, quality)?;
        fs::write(path, bytes).map_err(|e| {
            PixelpressError::write_access(format!("cannot write '{}': {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), format = ?format, "saved canvas");
        Ok(())
    }
}

const SAVE_DIR_MODE: u32 = 0o775;

fn load_from_path(path: &Path) -> PixelpressResult<(Canvas, ImageKind)> {
    let meta = fs::metadata(path).map_err(|e| {
        PixelpressError::unsupported_input(format!("unreadable source '{}': {e}", path.display()))
    })?;
    if meta.len() == 0 {
        return Err(PixelpressError::unsupported_input(format!(
            "zero-size source '{}'",
            path.display()
        )));
    }

    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format().ok_or_else(|| {
        PixelpressError::unsupported_input(format!(
            "'{}' is not a recognizable image",
            path.display()
        ))
    })?;
    let kind = ImageKind::classify(format).ok_or_else(|| {
        PixelpressError::unsupported_input(format!(
            "{format:?} (expected gif, jpeg or png)"
        ))
    })?;

    let decoded = reader.decode().map_err(|e| {
        PixelpressError::unsupported_input(format!("decode of '{}' failed: {e}", path.display()))
    })?;
    let canvas = Canvas::from_image(decoded.to_rgba8())?;
    Ok((canvas, kind))
}

/// Create every missing directory of `path`, applying `mode` only to the
/// directories created here (non-recursive permission application).
fn create_dir_path(path: &Path, mode: u32) -> PixelpressResult<()> {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        if current.as_os_str().is_empty() || current.is_dir() {
            continue;
        }
        fs::create_dir(&current).map_err(|e| {
            PixelpressError::write_access(format!(
                "cannot create directory '{}': {e}",
                current.display()
            ))
        })?;
        apply_mode(&current, mode);
    }
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        tracing::warn!(path = %path.display(), mode, "failed to apply directory mode: {e}");
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) {}
