use crate::canvas::Canvas;
use crate::corners;
use crate::document::ImageDocument;
use crate::error::PixelpressResult;
use crate::geom;
use crate::plan;
use crate::request::{OVERLAY_ALPHA_MAX, TransformRequest};
use crate::text::{self, FontFace, TEXT_ALPHA_MAX};

/// A text entry that could not be rendered (its font failed to load or
/// measure). Non-fatal: the rest of the pipeline still runs.
#[derive(Clone, Debug)]
pub struct SkippedText {
    pub index: usize,
    pub text: String,
    pub reason: String,
}

/// Outcome of one render pass.
#[derive(Clone, Debug, Default)]
pub struct RenderReport {
    pub skipped_texts: Vec<SkippedText>,
}

impl RenderReport {
    /// `true` when every requested element was rendered.
    pub fn is_clean(&self) -> bool {
        self.skipped_texts.is_empty()
    }
}

/// Apply a deferred edit request to the document's live canvas.
///
/// Stages run in fixed order: resize, overlays, rounded corners, text.
/// This is a pure function of (document, request): rendering the same
/// request twice applies every stage twice. Format and write errors
/// surface; per-entry font failures are collected in the report instead.
pub fn render(doc: &mut ImageDocument, req: &TransformRequest) -> PixelpressResult<RenderReport> {
    req.validate()?;

    apply_resize(doc, req)?;
    apply_overlays(doc, req)?;
    if let Some(rounding) = req.rounding {
        tracing::debug!(radius = rounding.radius, "rounding stage");
        corners::apply(doc.canvas_mut(), rounding.radius, rounding.color)?;
    }
    let skipped_texts = apply_texts(doc, req)?;

    Ok(RenderReport { skipped_texts })
}

fn apply_resize(doc: &mut ImageDocument, req: &TransformRequest) -> PixelpressResult<()> {
    let Some(plan) = plan::plan(doc.width(), doc.height(), &req.resize_spec()) else {
        return Ok(());
    };
    tracing::debug!(
        dst_w = plan.dst_w,
        dst_h = plan.dst_h,
        src = ?plan.src_rect,
        dst = ?plan.dst_rect,
        "resize stage"
    );

    let mut dst = Canvas::new(plan.dst_w, plan.dst_h)?;
    if let Some(bg) = req.background {
        dst.fill(bg);
    }
    dst.copy_resampled(doc.canvas().as_image(), plan.src_rect, plan.dst_rect);
    doc.replace_canvas(dst);
    Ok(())
}

fn apply_overlays(doc: &mut ImageDocument, req: &TransformRequest) -> PixelpressResult<()> {
    for overlay in &req.overlays {
        let layer = ImageDocument::open_source(&overlay.source)?;
        let pos = geom::resolve(
            overlay.anchor,
            overlay.x,
            overlay.y,
            layer.width(),
            layer.height(),
            doc.width(),
            doc.height(),
        );
        let opacity = f32::from(overlay.alpha) / f32::from(OVERLAY_ALPHA_MAX);
        tracing::debug!(source = overlay.source.as_str(), x = pos.x, y = pos.y, "overlay stage");
        doc.canvas_mut()
            .composite_over(layer.canvas().as_image(), pos.x, pos.y, opacity);
    }
    Ok(())
}

fn apply_texts(
    doc: &mut ImageDocument,
    req: &TransformRequest,
) -> PixelpressResult<Vec<SkippedText>> {
    let mut skipped = Vec::new();

    for (index, entry) in req.texts.iter().enumerate() {
        if entry.text.is_empty() {
            continue;
        }

        let font = match FontFace::load(&entry.font) {
            Ok(font) => font,
            Err(e) => {
                tracing::warn!(index, font = entry.font.as_str(), "skipping text entry: {e}");
                skipped.push(SkippedText {
                    index,
                    text: entry.text.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let size = if entry.size == 0 {
            let max_w = if entry.fit_width > 0 {
                entry.fit_width
            } else {
                doc.width()
            };
            let max_h = if entry.fit_height > 0 {
                entry.fit_height
            } else {
                doc.height()
            };
            text::auto_fit_size(&font, entry.angle, &entry.text, max_w, max_h)
        } else {
            entry.size
        };

        let bb = text::rotated_bounding_box(&font, size, entry.angle, &entry.text);
        let pos = geom::resolve(
            entry.anchor,
            entry.x,
            entry.y,
            bb.width,
            bb.height,
            doc.width(),
            doc.height(),
        );
        tracing::debug!(index, size, x = pos.x, y = pos.y, "text stage");

        let rendered = text::render_text(
            &font,
            size,
            entry.angle,
            &entry.text,
            entry.color,
            entry.alpha.min(TEXT_ALPHA_MAX),
        );
        doc.canvas_mut().composite_over(&rendered, pos.x, pos.y, 1.0);
    }

    Ok(skipped)
}
