use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Frame, Rgba, RgbaImage};

use crate::color::Rgb;
use crate::error::{PixelpressError, PixelpressResult};
use crate::geom::Rect;

/// Raster output formats supported by the encode boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Gif,
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Parse a format token as used in file extensions and display requests.
    pub fn parse(token: &str) -> PixelpressResult<Self> {
        match token.to_ascii_lowercase().as_str() {
            "gif" => Ok(Self::Gif),
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(PixelpressError::unsupported_output(format!(
                "'{other}' (expected gif, png, jpeg or jpg)"
            ))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// The in-memory raster buffer being edited.
///
/// Owns one straight-alpha RGBA8 image and exposes the narrow capability set
/// the pipeline stages need; nothing outside this module touches pixel
/// buffers or encoders directly.
#[derive(Clone, Debug)]
pub struct Canvas {
    img: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> PixelpressResult<Self> {
        if width == 0 || height == 0 {
            return Err(PixelpressError::validation(
                "canvas dimensions must be non-zero",
            ));
        }
        Ok(Self {
            img: RgbaImage::new(width, height),
        })
    }

    pub fn from_image(img: RgbaImage) -> PixelpressResult<Self> {
        if img.width() == 0 || img.height() == 0 {
            return Err(PixelpressError::validation(
                "canvas dimensions must be non-zero",
            ));
        }
        Ok(Self { img })
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.img
    }

    /// Fill the whole canvas with an opaque color.
    pub fn fill(&mut self, color: Rgb) {
        let px = Rgba([color.r, color.g, color.b, 255]);
        for p in self.img.pixels_mut() {
            *p = px;
        }
    }

    /// Resample `src_rect` of `src` into `dst_rect` of this canvas.
    ///
    /// Pixels are overwritten, not blended; rectangles are clipped to both
    /// buffers.
    pub fn copy_resampled(&mut self, src: &RgbaImage, src_rect: Rect, dst_rect: Rect) {
        if src_rect.w == 0 || src_rect.h == 0 || dst_rect.w == 0 || dst_rect.h == 0 {
            return;
        }

        let sx = src_rect.x.clamp(0, i64::from(src.width())) as u32;
        let sy = src_rect.y.clamp(0, i64::from(src.height())) as u32;
        let sw = src_rect.w.min(src.width().saturating_sub(sx));
        let sh = src_rect.h.min(src.height().saturating_sub(sy));
        if sw == 0 || sh == 0 {
            return;
        }

        let view = imageops::crop_imm(src, sx, sy, sw, sh).to_image();
        let scaled = if (sw, sh) == (dst_rect.w, dst_rect.h) {
            view
        } else {
            imageops::resize(&view, dst_rect.w, dst_rect.h, FilterType::CatmullRom)
        };

        self.copy_over(&scaled, dst_rect.x, dst_rect.y);
    }

    /// Overwrite pixels starting at `(x, y)` with `src`, clipped.
    pub fn copy_over(&mut self, src: &RgbaImage, x: i64, y: i64) {
        for (px, py, pixel) in src.enumerate_pixels() {
            let tx = x + i64::from(px);
            let ty = y + i64::from(py);
            if tx < 0 || ty < 0 || tx >= i64::from(self.img.width()) || ty >= i64::from(self.img.height()) {
                continue;
            }
            self.img.put_pixel(tx as u32, ty as u32, *pixel);
        }
    }

    /// Alpha-blend `src` over this canvas at `(x, y)` with an extra opacity
    /// factor in `0.0..=1.0`, clipped.
    pub fn composite_over(&mut self, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            return;
        }
        let op = (opacity * 255.0).round() as u16;

        for (px, py, pixel) in src.enumerate_pixels() {
            let tx = x + i64::from(px);
            let ty = y + i64::from(py);
            if tx < 0 || ty < 0 || tx >= i64::from(self.img.width()) || ty >= i64::from(self.img.height()) {
                continue;
            }
            let dst = self.img.get_pixel(tx as u32, ty as u32);
            let out = blend_straight(*dst, *pixel, op);
            self.img.put_pixel(tx as u32, ty as u32, out);
        }
    }

    /// Overwrite a horizontal pixel run on row `y` from `x0` to `x1`
    /// inclusive, clipped. No blending.
    pub fn draw_hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgba<u8>) {
        if y < 0 || y >= i64::from(self.img.height()) {
            return;
        }
        let (lo, hi) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let lo = lo.max(0);
        let hi = hi.min(i64::from(self.img.width()) - 1);
        for x in lo..=hi {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Extract a rectangular region as its own image, clipped to the canvas.
    pub fn region(&self, x: u32, y: u32, w: u32, h: u32) -> RgbaImage {
        let w = w.min(self.img.width().saturating_sub(x));
        let h = h.min(self.img.height().saturating_sub(y));
        imageops::crop_imm(&self.img, x, y, w, h).to_image()
    }

    /// Encode the canvas as raster bytes.
    ///
    /// `quality` applies to JPEG only; values outside `1..=100` fall back to
    /// the encoder default.
    pub fn encode(&self, format: OutputFormat, quality: Option<u8>) -> PixelpressResult<Vec<u8>> {
        let mut buf = Vec::new();
        match format {
            OutputFormat::Png => {
                self.img
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .map_err(|e| anyhow::anyhow!("png encode failed: {e}"))?;
            }
            OutputFormat::Jpeg => {
                let q = match quality {
                    Some(q) if (1..=100).contains(&q) => q,
                    _ => DEFAULT_JPEG_QUALITY,
                };
                let rgb = image::DynamicImage::ImageRgba8(self.img.clone()).to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), q);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| anyhow::anyhow!("jpeg encode failed: {e}"))?;
            }
            OutputFormat::Gif => {
                let mut encoder = GifEncoder::new(&mut buf);
                encoder
                    .encode_frame(Frame::new(self.img.clone()))
                    .map_err(|e| anyhow::anyhow!("gif encode failed: {e}"))?;
            }
        }
        Ok(buf)
    }
}

const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Straight-alpha source-over blend with an extra opacity factor in
/// `0..=255`.
pub(crate) fn blend_straight(dst: Rgba<u8>, src: Rgba<u8>, op: u16) -> Rgba<u8> {
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let da = u16::from(dst[3]);
    let inv = 255 - u16::from(sa);
    let out_a = u16::from(sa) + mul_div255(da, inv) as u16;
    if out_a == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    out[3] = out_a as u8;
    for i in 0..3 {
        // Weighted by effective alphas, normalized back to straight alpha.
        let sc = u32::from(src[i]) * u32::from(sa);
        let dc = u32::from(dst[i]) * u32::from(mul_div255(da, inv));
        out[i] = ((sc + dc) / u32::from(out_a)) as u8;
    }
    Rgba(out)
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn output_format_parses_aliases() {
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("JPEG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("png").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormat::parse("gif").unwrap(), OutputFormat::Gif);
        assert!(OutputFormat::parse("webp").is_err());
    }

    #[test]
    fn fill_sets_every_pixel_opaque() {
        let mut c = Canvas::new(4, 3).unwrap();
        c.fill(Rgb::new(10, 20, 30));
        assert!(c.as_image().pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn copy_resampled_identity_size_copies_pixels() {
        let mut c = Canvas::new(4, 4).unwrap();
        let src = solid(2, 2, [9, 9, 9, 255]);
        c.copy_resampled(&src, Rect::new(0, 0, 2, 2), Rect::new(1, 1, 2, 2));
        assert_eq!(c.as_image().get_pixel(1, 1).0, [9, 9, 9, 255]);
        assert_eq!(c.as_image().get_pixel(2, 2).0, [9, 9, 9, 255]);
        assert_eq!(c.as_image().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(c.as_image().get_pixel(3, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn copy_resampled_scales_source_region() {
        let mut c = Canvas::new(4, 4).unwrap();
        let src = solid(8, 8, [50, 60, 70, 255]);
        c.copy_resampled(&src, Rect::new(0, 0, 8, 8), Rect::new(0, 0, 4, 4));
        assert_eq!(c.as_image().get_pixel(2, 2).0, [50, 60, 70, 255]);
    }

    #[test]
    fn composite_over_full_opacity_replaces_opaque_pixels() {
        let mut c = Canvas::new(2, 2).unwrap();
        c.fill(Rgb::black());
        let src = solid(1, 1, [255, 0, 0, 255]);
        c.composite_over(&src, 0, 0, 1.0);
        assert_eq!(c.as_image().get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(c.as_image().get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn composite_over_half_opacity_blends() {
        let mut c = Canvas::new(1, 1).unwrap();
        c.fill(Rgb::black());
        let src = solid(1, 1, [255, 255, 255, 255]);
        c.composite_over(&src, 0, 0, 0.5);
        let px = c.as_image().get_pixel(0, 0).0;
        assert!(px[0] > 100 && px[0] < 160, "blended channel was {}", px[0]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn composite_over_clips_negative_positions() {
        let mut c = Canvas::new(2, 2).unwrap();
        let src = solid(2, 2, [1, 2, 3, 255]);
        c.composite_over(&src, -1, -1, 1.0);
        assert_eq!(c.as_image().get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(c.as_image().get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn draw_hline_overwrites_without_blending() {
        let mut c = Canvas::new(4, 2).unwrap();
        c.fill(Rgb::white());
        c.draw_hline(1, 9, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(c.as_image().get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(c.as_image().get_pixel(1, 0).0, [0, 0, 0, 0]);
        assert_eq!(c.as_image().get_pixel(3, 0).0, [0, 0, 0, 0]);
        assert_eq!(c.as_image().get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn encode_png_round_trips() {
        let mut c = Canvas::new(3, 3).unwrap();
        c.fill(Rgb::new(200, 100, 50));
        let bytes = c.encode(OutputFormat::Png, None).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (3, 3));
        assert_eq!(back.get_pixel(1, 1).0, [200, 100, 50, 255]);
    }

    #[test]
    fn encode_jpeg_accepts_quality_and_out_of_range_falls_back() {
        let mut c = Canvas::new(8, 8).unwrap();
        c.fill(Rgb::new(128, 128, 128));
        let a = c.encode(OutputFormat::Jpeg, Some(90)).unwrap();
        let b = c.encode(OutputFormat::Jpeg, Some(0)).unwrap();
        assert!(!a.is_empty());
        assert!(!b.is_empty());
        assert_eq!(
            image::guess_format(&a).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn encode_gif_produces_gif_bytes() {
        let mut c = Canvas::new(4, 4).unwrap();
        c.fill(Rgb::new(1, 2, 3));
        let bytes = c.encode(OutputFormat::Gif, None).unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Gif
        );
    }

    #[test]
    fn zero_canvas_is_rejected() {
        assert!(Canvas::new(0, 5).is_err());
        assert!(Canvas::new(5, 0).is_err());
    }
}
