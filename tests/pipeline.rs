use image::{Rgba, RgbaImage};

use pixelpress::{
    Anchor, ImageDocument, Offset, OverlayRequest, Rgb, TextRequest, TransformRequest, render,
};

fn write_png(dir: &std::path::Path, name: &str, img: &RgbaImage) -> std::path::PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

fn open_fixture(dir: &std::path::Path, name: &str, img: &RgbaImage) -> ImageDocument {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let path = write_png(dir, name, img);
    ImageDocument::open(&path).unwrap()
}

#[test]
fn crop_resize_keeps_the_centered_source_band() {
    let dir = tempfile::tempdir().unwrap();

    // 200x100 with a green center band from x=50 to x=149 and red margins;
    // a centered 100x100 crop sees only green.
    let mut img = RgbaImage::from_pixel(200, 100, Rgba([200, 0, 0, 255]));
    for y in 0..100 {
        for x in 50..150 {
            img.put_pixel(x, y, Rgba([0, 200, 0, 255]));
        }
    }
    let mut doc = open_fixture(dir.path(), "src.png", &img);

    let req = TransformRequest::builder().resize(100, 100).build().unwrap();
    let report = render(&mut doc, &req).unwrap();

    assert!(report.is_clean());
    assert_eq!((doc.width(), doc.height()), (100, 100));
    for &(x, y) in &[(0, 0), (99, 0), (50, 50), (0, 99), (99, 99)] {
        assert_eq!(doc.canvas().as_image().get_pixel(x, y).0, [0, 200, 0, 255]);
    }
}

#[test]
fn letterbox_fills_background_bands() {
    let dir = tempfile::tempdir().unwrap();
    let img = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 200, 255]));
    let mut doc = open_fixture(dir.path(), "src.png", &img);

    let req = TransformRequest::builder()
        .resize(100, 100)
        .no_crop()
        .background(Rgb::white())
        .build()
        .unwrap();
    render(&mut doc, &req).unwrap();

    assert_eq!((doc.width(), doc.height()), (100, 100));
    let out = doc.canvas().as_image();
    // Source lands as a centered 100x50 band; the rest is background.
    assert_eq!(out.get_pixel(50, 50).0, [0, 0, 200, 255]);
    assert_eq!(out.get_pixel(50, 5).0, [255, 255, 255, 255]);
    assert_eq!(out.get_pixel(50, 95).0, [255, 255, 255, 255]);
}

#[test]
fn overlay_composites_at_resolved_anchor() {
    let dir = tempfile::tempdir().unwrap();
    let base = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 255]));
    let stamp = RgbaImage::from_pixel(4, 4, Rgba([250, 250, 250, 255]));
    let mut doc = open_fixture(dir.path(), "base.png", &base);
    let stamp_path = write_png(dir.path(), "stamp.png", &stamp);

    let req = TransformRequest::builder()
        .overlay(OverlayRequest {
            source: stamp_path.to_string_lossy().into_owned(),
            anchor: Anchor::RightBottom,
            x: Offset::Px(0),
            y: Offset::Px(0),
            alpha: 100,
        })
        .build()
        .unwrap();
    render(&mut doc, &req).unwrap();

    let out = doc.canvas().as_image();
    assert_eq!(out.get_pixel(39, 19).0, [250, 250, 250, 255]);
    assert_eq!(out.get_pixel(36, 16).0, [250, 250, 250, 255]);
    assert_eq!(out.get_pixel(35, 15).0, [0, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[test]
fn rounding_stage_erases_corners_after_resize() {
    let dir = tempfile::tempdir().unwrap();
    let img = RgbaImage::from_pixel(200, 100, Rgba([120, 40, 40, 255]));
    let mut doc = open_fixture(dir.path(), "src.png", &img);

    let req = TransformRequest::builder()
        .resize(60, 60)
        .rounded(10, None)
        .build()
        .unwrap();
    render(&mut doc, &req).unwrap();

    let out = doc.canvas().as_image();
    assert_eq!((doc.width(), doc.height()), (60, 60));
    for &(x, y) in &[(0, 0), (59, 0), (0, 59), (59, 59)] {
        assert_eq!(out.get_pixel(x, y).0[3], 0, "corner ({x},{y})");
    }
    assert_eq!(out.get_pixel(30, 30).0, [120, 40, 40, 255]);
}

#[test]
fn rerendering_without_reset_applies_stages_twice() {
    let dir = tempfile::tempdir().unwrap();
    let base = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
    let layer = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
    let mut doc = open_fixture(dir.path(), "base.png", &base);
    let layer_path = write_png(dir.path(), "layer.png", &layer);

    let req = TransformRequest::builder()
        .overlay(OverlayRequest {
            source: layer_path.to_string_lossy().into_owned(),
            anchor: Anchor::TopLeft,
            x: Offset::Px(0),
            y: Offset::Px(0),
            alpha: 50,
        })
        .build()
        .unwrap();

    render(&mut doc, &req).unwrap();
    let once = doc.canvas().as_image().get_pixel(5, 5).0[0];

    render(&mut doc, &req).unwrap();
    let twice = doc.canvas().as_image().get_pixel(5, 5).0[0];

    // The half-opacity overlay blends once per render; no implicit reset.
    assert!(once > 100 && once < 160, "single blend was {once}");
    assert!(twice > once, "second render must blend again ({twice} vs {once})");
}

#[test]
fn reset_restores_the_original_between_renders() {
    let dir = tempfile::tempdir().unwrap();
    let img = RgbaImage::from_pixel(80, 40, Rgba([7, 8, 9, 255]));
    let mut doc = open_fixture(dir.path(), "src.png", &img);

    let req = TransformRequest::builder().resize(20, 20).build().unwrap();
    render(&mut doc, &req).unwrap();
    assert_eq!((doc.width(), doc.height()), (20, 20));

    doc.reset().unwrap();
    assert_eq!((doc.width(), doc.height()), (80, 40));
    assert_eq!(doc.canvas().as_image().get_pixel(0, 0).0, [7, 8, 9, 255]);

    render(&mut doc, &req).unwrap();
    assert_eq!((doc.width(), doc.height()), (20, 20));
}

#[test]
fn skipped_text_entries_do_not_block_other_stages() {
    let dir = tempfile::tempdir().unwrap();
    let img = RgbaImage::from_pixel(50, 50, Rgba([1, 1, 1, 255]));
    let mut doc = open_fixture(dir.path(), "src.png", &img);

    let bogus_font = dir.path().join("missing.ttf");
    let req = TransformRequest::builder()
        .resize(25, 25)
        .text(TextRequest {
            text: "watermark".to_string(),
            font: bogus_font.to_string_lossy().into_owned(),
            size: 12,
            ..TextRequest::default()
        })
        .text(TextRequest {
            text: "second".to_string(),
            font: bogus_font.to_string_lossy().into_owned(),
            size: 8,
            ..TextRequest::default()
        })
        .build()
        .unwrap();

    let report = render(&mut doc, &req).unwrap();
    assert_eq!(report.skipped_texts.len(), 2);
    assert_eq!(report.skipped_texts[0].index, 0);
    assert_eq!(report.skipped_texts[1].index, 1);
    assert!(!report.is_clean());
    // The resize still happened.
    assert_eq!((doc.width(), doc.height()), (25, 25));
}

#[test]
fn request_json_drives_a_render() {
    let dir = tempfile::tempdir().unwrap();
    let img = RgbaImage::from_pixel(120, 60, Rgba([30, 30, 30, 255]));
    let mut doc = open_fixture(dir.path(), "src.png", &img);

    let req: TransformRequest = serde_json::from_str(
        r#"{
            "width": 40,
            "height": 40,
            "rounding": { "radius": 6 }
        }"#,
    )
    .unwrap();
    render(&mut doc, &req).unwrap();

    assert_eq!((doc.width(), doc.height()), (40, 40));
    assert_eq!(doc.canvas().as_image().get_pixel(0, 0).0[3], 0);
    assert_eq!(doc.canvas().as_image().get_pixel(20, 20).0, [30, 30, 30, 255]);
}
