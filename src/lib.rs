#![forbid(unsafe_code)]

//! Deferred raster image editing: resize/crop planning, overlay and text
//! compositing, antialiased rounded corners, GIF/JPEG/PNG in and out.

pub mod canvas;
pub mod color;
pub mod corners;
pub mod document;
pub mod error;
pub mod geom;
pub mod pipeline;
pub mod plan;
pub mod request;
pub mod text;

pub use canvas::{Canvas, OutputFormat};
pub use color::Rgb;
pub use document::{ImageDocument, ImageKind};
pub use error::{PixelpressError, PixelpressResult};
pub use geom::{Anchor, Offset, Point, Rect};
pub use pipeline::{RenderReport, SkippedText, render};
pub use plan::{ResizePlan, ResizeSpec};
pub use request::{
    OverlayRequest, Rounding, TextRequest, TransformRequest, TransformRequestBuilder,
};
pub use text::{FontFace, TextBox, auto_fit_size, rotated_bounding_box};
