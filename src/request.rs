use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{PixelpressError, PixelpressResult};
use crate::geom::{Anchor, Offset};
use crate::plan::ResizeSpec;
use crate::text::TEXT_ALPHA_MAX;

/// Maximum overlay alpha; 100 is opaque, 0 invisible.
pub const OVERLAY_ALPHA_MAX: u8 = 100;

/// One overlay image to composite onto the canvas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayRequest {
    /// Local path or, with remote fetching enabled, a URL.
    pub source: String,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub x: Offset,
    #[serde(default)]
    pub y: Offset,
    /// Opacity in `0..=100`, 100 = opaque.
    #[serde(default = "overlay_alpha_default")]
    pub alpha: u8,
}

fn overlay_alpha_default() -> u8 {
    OVERLAY_ALPHA_MAX
}

/// One text run to composite onto the canvas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
    /// Path to a TTF/OTF font file.
    pub font: String,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub x: Offset,
    #[serde(default)]
    pub y: Offset,
    #[serde(default = "text_color_default")]
    pub color: Rgb,
    /// Font size in pixels; 0 = auto-fit to the fit box.
    #[serde(default)]
    pub size: u32,
    /// Rotation in degrees, counter-clockwise.
    #[serde(default)]
    pub angle: f64,
    /// Transparency in `0..=127`, 0 = opaque.
    #[serde(default)]
    pub alpha: u8,
    /// Fit-box width for auto-fit; 0 = canvas width.
    #[serde(default)]
    pub fit_width: u32,
    /// Fit-box height for auto-fit; 0 = canvas height.
    #[serde(default)]
    pub fit_height: u32,
}

fn text_color_default() -> Rgb {
    Rgb::black()
}

impl Default for TextRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: String::new(),
            anchor: Anchor::default(),
            x: Offset::default(),
            y: Offset::default(),
            color: Rgb::black(),
            size: 0,
            angle: 0.0,
            alpha: 0,
            fit_width: 0,
            fit_height: 0,
        }
    }
}

/// Rounded-corner configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Rounding {
    /// Corner radius in pixels; 0 = `min(w, h) / 2`.
    #[serde(default)]
    pub radius: u32,
    /// Corner fill; `None` erases to transparency.
    #[serde(default)]
    pub color: Option<Rgb>,
}

/// The full deferred edit description, immutable once built.
///
/// Rendering is a pure function of (document, request): applying the same
/// request twice applies every stage twice.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformRequest {
    /// Target width, 0 = derive from height.
    pub width: u32,
    /// Target height, 0 = derive from width.
    pub height: u32,
    pub crop: bool,
    pub background: Option<Rgb>,
    pub upscale: bool,
    pub limit_both_sides: bool,
    pub rounding: Option<Rounding>,
    pub overlays: Vec<OverlayRequest>,
    pub texts: Vec<TextRequest>,
}

impl Default for TransformRequest {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            crop: true,
            background: None,
            upscale: false,
            limit_both_sides: false,
            rounding: None,
            overlays: Vec::new(),
            texts: Vec::new(),
        }
    }
}

impl TransformRequest {
    pub fn builder() -> TransformRequestBuilder {
        TransformRequestBuilder::new()
    }

    pub(crate) fn resize_spec(&self) -> ResizeSpec {
        ResizeSpec {
            width: self.width,
            height: self.height,
            crop: self.crop,
            upscale: self.upscale,
            limit_both_sides: self.limit_both_sides,
        }
    }

    pub fn validate(&self) -> PixelpressResult<()> {
        for (i, overlay) in self.overlays.iter().enumerate() {
            if overlay.source.trim().is_empty() {
                return Err(PixelpressError::validation(format!(
                    "overlay {i} has an empty source"
                )));
            }
            if overlay.alpha > OVERLAY_ALPHA_MAX {
                return Err(PixelpressError::validation(format!(
                    "overlay {i} alpha {} exceeds {OVERLAY_ALPHA_MAX}",
                    overlay.alpha
                )));
            }
        }
        for (i, text) in self.texts.iter().enumerate() {
            if text.font.trim().is_empty() {
                return Err(PixelpressError::validation(format!(
                    "text {i} has an empty font path"
                )));
            }
            if text.alpha > TEXT_ALPHA_MAX {
                return Err(PixelpressError::validation(format!(
                    "text {i} alpha {} exceeds {TEXT_ALPHA_MAX}",
                    text.alpha
                )));
            }
        }
        Ok(())
    }
}

/// Fluent builder over [`TransformRequest`].
pub struct TransformRequestBuilder {
    req: TransformRequest,
}

impl Default for TransformRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformRequestBuilder {
    pub fn new() -> Self {
        Self {
            req: TransformRequest::default(),
        }
    }

    pub fn resize(mut self, width: u32, height: u32) -> Self {
        self.req.width = width;
        self.req.height = height;
        self
    }

    /// Letterbox instead of cropping.
    pub fn no_crop(mut self) -> Self {
        self.req.crop = false;
        self
    }

    /// Letterbox background fill.
    pub fn background(mut self, color: Rgb) -> Self {
        self.req.background = Some(color);
        self
    }

    /// Allow growing beyond the source dimensions.
    pub fn upscale(mut self, allow: bool) -> Self {
        self.req.upscale = allow;
        self
    }

    /// Fit the longer source side to the target width.
    pub fn limit_both_sides(mut self) -> Self {
        self.req.limit_both_sides = true;
        self
    }

    pub fn rounded(mut self, radius: u32, color: Option<Rgb>) -> Self {
        self.req.rounding = Some(Rounding { radius, color });
        self
    }

    pub fn overlay(mut self, overlay: OverlayRequest) -> Self {
        self.req.overlays.push(overlay);
        self
    }

    pub fn text(mut self, text: TextRequest) -> Self {
        self.req.texts.push(text);
        self
    }

    pub fn build(self) -> PixelpressResult<TransformRequest> {
        self.req.validate()?;
        Ok(self.req)
    }
}
