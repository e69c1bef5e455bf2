//! # End-to-End Rendering Tests
//!
//! Drive the full pipeline: template on disk → controller → PNG bytes.
//! Text goes through the built-in bitmap font so no font files are needed.

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

use ticket_stamp::{
    Canvas, Platform, TicketConfig, TicketController,
    config::Field,
    controller::{BackgroundStatus, GenerateOutcome},
    font::{FontBook, FontFace},
    form::FormInputs,
    loader::AssetLoader,
    surface::Surface,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Temp asset root holding white templates, sized to match the desktop
/// canvas and a 390px mobile viewport so no resampling happens.
fn asset_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("ticket-assets-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(root.join("images")).unwrap();
    for (name, width, height) in [
        ("template-bg.png", 1400, 875),
        ("template-bg-mobile.png", 351, 219),
    ] {
        RgbaImage::from_pixel(width, height, WHITE)
            .save(root.join("images").join(name))
            .unwrap();
    }
    root
}

fn controller(platform: Platform, viewport: f32) -> TicketController<Canvas> {
    controller_with_fonts(platform, viewport, FontBook::new())
}

fn controller_with_fonts(platform: Platform, viewport: f32, fonts: FontBook) -> TicketController<Canvas> {
    TicketController::new(
        platform,
        Arc::new(TicketConfig::default()),
        Arc::new(fonts),
        Canvas::new(1, 1),
        viewport,
    )
}

/// Render a desktop ticket and return its pixels.
async fn render_desktop(fonts: FontBook, inputs: FormInputs) -> RgbaImage {
    let root = asset_root();
    let loader = AssetLoader::from_root(root.to_str().unwrap()).unwrap();
    let mut controller = controller_with_fonts(Platform::Desktop, 0.0, fonts);
    controller.start_loading(&loader);
    controller.generate(inputs);
    controller.settle().await;
    std::fs::remove_dir_all(root).unwrap();
    controller.surface().pixels().clone()
}

/// Pixels of the `w × h` region centered on (x, y).
fn region(image: &RgbaImage, x: f32, y: f32, w: u32, h: u32) -> Vec<Rgba<u8>> {
    let (x0, y0) = (x as u32 - w / 2, y as u32 - h / 2);
    (y0..y0 + h)
        .flat_map(|py| (x0..x0 + w).map(move |px| (px, py)))
        .map(|(px, py)| *image.get_pixel(px, py))
        .collect()
}

fn inputs() -> FormInputs {
    FormInputs {
        start_place: "北京".into(),
        end_place: "上海".into(),
        name: "张三".into(),
        date: "2024-01-01".into(),
    }
}

/// Whether any pixel within `radius` of (x, y) differs from the template.
fn has_ink_near(image: &RgbaImage, x: f32, y: f32, rx: i64, ry: i64) -> bool {
    let (cx, cy) = (x.round() as i64, y.round() as i64);
    (cy - ry..=cy + ry).any(|py| {
        (cx - rx..=cx + rx).any(|px| {
            px >= 0
                && py >= 0
                && (px as u32) < image.width()
                && (py as u32) < image.height()
                && *image.get_pixel(px as u32, py as u32) != WHITE
        })
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_desktop_ticket_end_to_end() {
    let root = asset_root();
    let loader = AssetLoader::from_root(root.to_str().unwrap()).unwrap();

    let mut controller = controller(Platform::Desktop, 0.0);
    controller.start_loading(&loader);
    assert_eq!(controller.generate(inputs()), GenerateOutcome::Deferred);
    controller.settle().await;
    assert_eq!(controller.status(), BackgroundStatus::Ready);

    let config = TicketConfig::default();
    let drawn = controller.drawn();
    assert_eq!(drawn.len(), 4);
    for (placement, (field, anchor)) in drawn.iter().zip(config.anchors.ordered()) {
        assert_eq!(placement.field, field);
        assert_eq!((placement.x, placement.y), (anchor.x, anchor.y));
        assert_eq!(placement.style.size, 32.0);
        assert_eq!(placement.style.color, "#000000");
        assert_eq!(placement.style.font, "HYShangWeiShouShuW");
        assert!(placement.style.is_bold());
    }
    assert_eq!(drawn[0].text, "北京");
    assert_eq!(drawn[3].text, "2024-01-01");

    let download = controller.export(None).unwrap();
    assert_eq!(download.file_name, "custom-image.png");
    let decoded = image::load_from_memory(&download.bytes).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (1400, 875));

    for placement in drawn {
        assert!(
            has_ink_near(&decoded, placement.x, placement.y, 60, 20),
            "{:?} should be drawn near its anchor",
            placement.field
        );
    }
    assert_eq!(decoded.get_pixel(100, 100), &WHITE);

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn test_mobile_ticket_end_to_end() {
    let root = asset_root();
    let loader = AssetLoader::from_root(root.to_str().unwrap()).unwrap();

    let mut controller = controller(Platform::Mobile, 390.0);
    controller.start_loading(&loader);
    controller.settle().await;
    assert_eq!(controller.generate(inputs()), GenerateOutcome::Drawn);

    let factor = controller.layout().scale.scale_factor;
    assert!((factor - 351.0 / 1400.0).abs() < 1e-4);
    let date = &controller.drawn()[3];
    assert_eq!(date.field, Field::Date);
    assert_eq!((date.x, date.y), (1210.0 * factor, 752.0 * factor));
    assert_eq!(date.style.size, 8.0);
    assert_eq!(date.style.font, "cursive");

    assert_eq!(controller.surface().size(), (351, 219));
    let pixels = controller.surface().pixels();
    assert!(has_ink_near(pixels, date.x, date.y, 20, 6));

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn test_missing_template_reports_failure() {
    let root = std::env::temp_dir().join(format!("ticket-empty-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();
    let loader = AssetLoader::from_root(root.to_str().unwrap()).unwrap();

    let mut controller = controller(Platform::Desktop, 0.0);
    controller.start_loading(&loader);
    controller.settle().await;

    assert_eq!(controller.status(), BackgroundStatus::Failed);
    assert_eq!(controller.generate(inputs()), GenerateOutcome::Blocked);
    assert!(controller.drawn().is_empty());
    assert!(controller.export(None).is_err());

    std::fs::remove_dir_all(root).unwrap();
}

#[tokio::test]
async fn test_different_values_draw_different_pixels() {
    let config = TicketConfig::default();
    let origin = config.anchors.origin;
    let date = config.anchors.date;

    let first = render_desktop(FontBook::new(), inputs()).await;
    let second = render_desktop(
        FontBook::new(),
        FormInputs {
            start_place: "上海".into(),
            date: "2025-12-31".into(),
            ..inputs()
        },
    )
    .await;

    assert!(region(&first, origin.x, origin.y, 120, 40) != region(&second, origin.x, origin.y, 120, 40));
    assert!(region(&first, date.x, date.y, 200, 40) != region(&second, date.x, date.y, 200, 40));

    let defaults = render_desktop(FontBook::new(), FormInputs::from_defaults(&config.defaults)).await;
    assert!(region(&defaults, origin.x, origin.y, 120, 40) != region(&defaults, date.x, date.y, 120, 40));
}

#[tokio::test]
async fn test_installed_cjk_font_renders_place_names() {
    let mut fonts = FontBook::new();
    fonts.load_system_fonts(&["HYShangWeiShouShuW"]);
    if matches!(fonts.face_for("HYShangWeiShouShuW", "北京上海"), FontFace::Bitmap) {
        eprintln!("no installed font covers CJK, skipping");
        return;
    }
    assert!(fonts.fallback_count() > 0 || fonts.contains("HYShangWeiShouShuW"));

    let origin = TicketConfig::default().anchors.origin;
    let beijing = render_desktop(fonts.clone(), inputs()).await;
    let shanghai = render_desktop(
        fonts,
        FormInputs {
            start_place: "上海".into(),
            ..inputs()
        },
    )
    .await;

    assert!(has_ink_near(&beijing, origin.x, origin.y, 40, 20));
    assert!(region(&beijing, origin.x, origin.y, 120, 40) != region(&shanghai, origin.x, origin.y, 120, 40));
}

#[test]
fn test_empty_fields_fall_back_to_defaults() {
    let config = TicketConfig::default();
    let form = std::collections::HashMap::from([
        ("startPlace".to_string(), String::new()),
        ("name".to_string(), "李四".to_string()),
    ]);
    let inputs = FormInputs::extract(&form, &config.defaults);

    assert_eq!(inputs.get(Field::Origin), "未填写");
    assert_eq!(inputs.get(Field::Destination), "未填写");
    assert_eq!(inputs.get(Field::Name), "李四");
    assert_eq!(inputs.get(Field::Date), "未知时间");
}
