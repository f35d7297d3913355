use image::{Rgba, RgbaImage};

use crate::canvas::Canvas;
use crate::color::Rgb;
use crate::error::PixelpressResult;
use crate::geom::Rect;

/// Oversampling factor for the corner mask. Higher values soften the arc
/// at the cost of time and memory; quality saturates quickly past 10.
const OVERSAMPLE_RATE: u32 = 10;

/// Erase runs for one row of the supersampled corner tile.
///
/// `i` is the row offset from the tile center in `-rs..=rs`. Returns
/// `(right_start, left_end)`: pixels at `x >= right_start` and
/// `x <= left_end` lie outside the quarter-circle boundary
/// `x = sqrt(rs^2 - i^2)` and get erased. Coordinates truncate toward zero
/// the way the raster line primitive does.
fn erase_spans(rs: u32, i: i64) -> (i64, i64) {
    let rs_f = f64::from(rs);
    let x = rs_f + (rs_f * rs_f - (i * i) as f64).sqrt();
    let size = 2.0 * rs_f;
    (x.trunc() as i64, (size - x).trunc() as i64)
}

/// Erase the four canvas corners outside a rounded rectangle of the given
/// radius, antialiased by supersampling.
///
/// Radius 0 defaults to `min(w, h) / 2`; any radius is clamped to that
/// bound. Without a color the corners become transparent white; with one
/// they are painted opaquely.
pub fn apply(canvas: &mut Canvas, radius: u32, color: Option<Rgb>) -> PixelpressResult<()> {
    let w = canvas.width();
    let h = canvas.height();

    let limit = w.min(h) / 2;
    let radius = match radius {
        0 => limit,
        r => r.min(limit),
    };
    if radius == 0 {
        return Ok(());
    }

    let rs = radius * OVERSAMPLE_RATE;
    let size = rs * 2;

    let erase = match color {
        Some(c) => Rgba([c.r, c.g, c.b, 255]),
        None => Rgba([255, 255, 255, 0]),
    };

    let mut tile = Canvas::from_image(RgbaImage::from_pixel(size, size, erase))?;

    // (tile x, tile y, canvas x, canvas y) for the four corner quadrants,
    // oriented so the tile center meets each rounded corner's center.
    let quadrants = [
        (0, 0, 0, 0),
        (rs, 0, w - radius, 0),
        (rs, rs, w - radius, h - radius),
        (0, rs, 0, h - radius),
    ];

    for &(tx, ty, cx, cy) in &quadrants {
        tile.copy_resampled(
            canvas.as_image(),
            Rect::new(i64::from(cx), i64::from(cy), radius, radius),
            Rect::new(i64::from(tx), i64::from(ty), rs, rs),
        );
    }

    for i in -i64::from(rs)..=i64::from(rs) {
        let y = i + i64::from(rs);
        let (right_start, left_end) = erase_spans(rs, i);
        tile.draw_hline(right_start, i64::from(size), y, erase);
        tile.draw_hline(0, left_end, y, erase);
    }

    for &(tx, ty, cx, cy) in &quadrants {
        canvas.copy_resampled(
            tile.as_image(),
            Rect::new(i64::from(tx), i64::from(ty), rs, rs),
            Rect::new(i64::from(cx), i64::from(cy), radius, radius),
        );
    }

    Ok(())
}
