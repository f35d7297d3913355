use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use kurbo::{Affine, Point as KPoint};

use crate::canvas::blend_straight;
use crate::color::Rgb;
use crate::error::{PixelpressError, PixelpressResult};

/// Maximum text alpha; 0 is opaque, 127 invisible.
pub const TEXT_ALPHA_MAX: u8 = 127;

/// Axis-aligned bounding box of (possibly rotated) text, plus the
/// translation that moves the box's top-left corner to the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextBox {
    pub width: u32,
    pub height: u32,
    pub x_offset: i64,
    pub y_offset: i64,
}

/// Bounding-box query against a font engine. The pipeline uses the real
/// [`FontFace`]; fitting tests inject synthetic metrics.
pub trait TextMeasure {
    /// Width and height of `text` at `size`, angle 0.
    fn measure(&self, size: u32, text: &str) -> (f64, f64);
}

/// A loaded font resource.
pub struct FontFace {
    font: FontVec,
}

impl FontFace {
    pub fn load(path: impl AsRef<Path>) -> PixelpressResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            PixelpressError::validation(format!("unreadable font '{}': {e}", path.display()))
        })?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> PixelpressResult<Self> {
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| PixelpressError::validation(format!("invalid font data: {e}")))?;
        Ok(Self { font })
    }
}

impl TextMeasure for FontFace {
    fn measure(&self, size: u32, text: &str) -> (f64, f64) {
        let scaled = self.font.as_scaled(PxScale::from(size as f32));

        let mut width = 0.0f32;
        let mut prev: Option<ab_glyph::GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        (f64::from(width), f64::from(scaled.height()))
    }
}

/// Bounding box of `text` at `size` after rotating it `angle_deg` degrees.
///
/// The four corners of the angle-0 box are rotated with
/// `x' = x cos t + y sin t`, `y' = y cos t - x sin t` and re-boxed; offsets
/// are the negated minima.
pub fn rotated_bounding_box(
    font: &impl TextMeasure,
    size: u32,
    angle_deg: f64,
    text: &str,
) -> TextBox {
    let (w, h) = font.measure(size, text);
    let rot = Affine::rotate(-angle_deg.to_radians());

    let corners = [
        KPoint::new(0.0, 0.0),
        KPoint::new(w, 0.0),
        KPoint::new(w, h),
        KPoint::new(0.0, h),
    ]
    .map(|p| rot * p);

    let xs = corners.map(|p| p.x.round() as i64);
    let ys = corners.map(|p| p.y.round() as i64);
    let min_x = *xs.iter().min().unwrap_or(&0);
    let max_x = *xs.iter().max().unwrap_or(&0);
    let min_y = *ys.iter().min().unwrap_or(&0);
    let max_y = *ys.iter().max().unwrap_or(&0);

    TextBox {
        width: (max_x - min_x) as u32,
        height: (max_y - min_y) as u32,
        x_offset: -min_x,
        y_offset: -min_y,
    }
}

/// Largest font size whose rotated bounding box stays within
/// `max_w x max_h`.
///
/// Binary search over `[1, max_h]`; the returned lower bound is guaranteed
/// to fit whenever any size in the range does.
pub fn auto_fit_size(
    font: &impl TextMeasure,
    angle_deg: f64,
    text: &str,
    max_w: u32,
    max_h: u32,
) -> u32 {
    let mut lo = 1u32;
    let mut hi = max_h.max(1);

    loop {
        let size = ((f64::from(lo) + f64::from(hi)) / 2.0).round() as u32;
        let bb = rotated_bounding_box(font, size, angle_deg, text);
        if bb.width > max_w || bb.height > max_h {
            hi = size;
        } else {
            lo = size;
        }
        if hi.abs_diff(lo) < 2 {
            break;
        }
    }

    lo
}

/// Render `text` into its own transparent image, rotated by `angle_deg`.
///
/// `alpha` follows the text-alpha convention: 0 opaque through
/// [`TEXT_ALPHA_MAX`] invisible.
pub fn render_text(
    font: &FontFace,
    size: u32,
    angle_deg: f64,
    text: &str,
    color: Rgb,
    alpha: u8,
) -> RgbaImage {
    let scale = PxScale::from(size as f32);
    let scaled = font.font.as_scaled(scale);

    let (w, h) = font.measure(size, text);
    let canvas_w = (w.ceil() as u32).max(1);
    let canvas_h = (h.ceil() as u32).max(1);
    let mut img = RgbaImage::new(canvas_w, canvas_h);

    let alpha = alpha.min(TEXT_ALPHA_MAX);
    let opacity = f32::from(TEXT_ALPHA_MAX - alpha) / f32::from(TEXT_ALPHA_MAX);
    let max_alpha = (opacity * 255.0).round();

    let baseline_y = scaled.ascent();
    let mut cursor_x = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            cursor_x += scaled.kern(p, id);
        }

        let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));
        if let Some(outlined) = font.font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x < 0 || y < 0 || x >= canvas_w as i32 || y >= canvas_h as i32 {
                    return;
                }
                let a = (coverage * max_alpha) as u8;
                let src = Rgba([color.r, color.g, color.b, a]);
                let dst = img.get_pixel(x as u32, y as u32);
                let out = blend_straight(*dst, src, 255);
                img.put_pixel(x as u32, y as u32, out);
            });
        }

        cursor_x += scaled.h_advance(id);
        prev = Some(id);
    }

    if angle_deg != 0.0 {
        img = rotate_rgba(&img, angle_deg);
    }
    img
}

/// Rotate an RGBA image by `angle_deg` under the same convention as
/// [`rotated_bounding_box`], resizing the output to the rotated bounds and
/// sampling bilinearly.
fn rotate_rgba(image: &RgbaImage, angle_deg: f64) -> RgbaImage {
    let theta = angle_deg.to_radians();
    let (cos, sin) = (theta.cos() as f32, theta.sin() as f32);

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    // Forward map (about the center): x' = x cos t + y sin t,
    // y' = y cos t - x sin t.
    let corners = [
        (-cx, -cy),
        (src_w - cx, -cy),
        (-cx, src_h - cy),
        (src_w - cx, src_h - cy),
    ];
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for (x, y) in corners {
        let rx = x * cos + y * sin;
        let ry = y * cos - x * sin;
        min_x = min_x.min(rx);
        max_x = max_x.max(rx);
        min_y = min_y.min(ry);
        max_y = max_y.max(ry);
    }

    let dst_w = ((max_x - min_x).ceil() as u32).max(1);
    let dst_h = ((max_y - min_y).ceil() as u32).max(1);
    let mut out = RgbaImage::new(dst_w, dst_h);

    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f32 - dst_cx;
            let ry = dy as f32 - dst_cy;

            // Inverse map back into source space.
            let sx = rx * cos - ry * sin + cx;
            let sy = rx * sin + ry * cos + cy;

            if sx < 0.0 || sy < 0.0 || sx >= src_w - 1.0 || sy >= src_h - 1.0 {
                continue;
            }

            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let p00 = image.get_pixel(x0, y0);
            let p10 = image.get_pixel(x0 + 1, y0);
            let p01 = image.get_pixel(x0, y0 + 1);
            let p11 = image.get_pixel(x0 + 1, y0 + 1);

            let mut px = [0u8; 4];
            for (c, slot) in px.iter_mut().enumerate() {
                let v = f32::from(p00[c]) * (1.0 - fx) * (1.0 - fy)
                    + f32::from(p10[c]) * fx * (1.0 - fy)
                    + f32::from(p01[c]) * (1.0 - fx) * fy
                    + f32::from(p11[c]) * fx * fy;
                *slot = v.clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(dx, dy, Rgba(px));
        }
    }

    out
}
