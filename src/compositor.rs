//! Centered text compositing.
//!
//! Text is centered on its anchor both ways, the way a 2D canvas draws with
//! `textAlign = center` and `textBaseline = middle`: the line's advance is
//! split evenly around `x`, and its em box (ascent to descent) around `y`.
//! One line only. Nothing wraps, and long text runs past the anchor on both
//! sides.

use image::{Rgba, RgbaImage};

use crate::config::TextStyle;
use crate::font::{FontBook, LineWindow, TextMask};

/// Parse `#rrggbb`, `#rgb` or `#rrggbbaa`.
pub fn parse_color(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in digits.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Some(Rgba([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            255,
        ])),
        8 => Some(Rgba([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            channel(&digits[6..8])?,
        ])),
        _ => None,
    }
}

fn style_color(style: &TextStyle) -> Rgba<u8> {
    parse_color(&style.color).unwrap_or_else(|| {
        tracing::warn!(color = %style.color, "invalid text color, drawing black");
        Rgba([0, 0, 0, 255])
    })
}

/// Rasterize `text` in `style` and paint it centered on `(x, y)`.
pub fn draw_centered_text(
    image: &mut RgbaImage,
    text: &str,
    x: f32,
    y: f32,
    style: &TextStyle,
    fonts: &FontBook,
) {
    if let Some((mask, left, top)) = rasterize_visible(image.width(), text, x, y, style, fonts) {
        paint_mask(image, &mask, left, top, style_color(style));
    }
}

/// Rasterize the part of the centered line that lands on a surface
/// `surface_width` pixels wide. Returns the mask and its top-left corner in
/// surface coordinates.
fn rasterize_visible(
    surface_width: u32,
    text: &str,
    x: f32,
    y: f32,
    style: &TextStyle,
    fonts: &FontBook,
) -> Option<(TextMask, i64, i64)> {
    if text.is_empty() || style.size <= 0.0 {
        return None;
    }

    let face = fonts.face_for(&style.font, text);
    let advance = face.measure(text, style.size);
    let line_left = x - advance / 2.0;
    let window = LineWindow::visible(advance, line_left, surface_width as f32)?;

    let mut mask = face.render_line(text, style.size, window);
    if style.is_bold() {
        mask.embolden(bold_stroke(style.size));
    }

    let left = (line_left - mask.pen_x).round() as i64;
    let top = (y - mask.em_height / 2.0 - mask.em_top).round() as i64;
    Some((mask, left, top))
}

/// Extra stroke width for synthetic bold: one pixel per 32px of size.
fn bold_stroke(size: f32) -> usize {
    (size / 32.0).round().max(1.0) as usize
}

fn paint_mask(image: &mut RgbaImage, mask: &TextMask, left: i64, top: i64, color: Rgba<u8>) {
    let (width, height) = (image.width() as i64, image.height() as i64);
    for my in 0..mask.height {
        let py = top + my as i64;
        if py < 0 || py >= height {
            continue;
        }
        for mx in 0..mask.width {
            let px = left + mx as i64;
            if px < 0 || px >= width {
                continue;
            }
            let coverage = mask.coverage(mx, my);
            if coverage > 0.0 {
                blend_over(image.get_pixel_mut(px as u32, py as u32), color, coverage);
            }
        }
    }
}

/// Source-over blend of `color` at `coverage` onto `dst` (straight alpha).
fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let src_a = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let src = color[c] as f32;
        let below = dst[c] as f32;
        let mixed = (src * src_a + below * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
