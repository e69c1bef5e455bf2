//! TrueType rendering via ab_glyph.
//!
//! Lays glyphs out on a single baseline with kerning and rasterizes the ones
//! inside the requested window into an anti-aliased coverage mask.

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use std::collections::BTreeSet;

use super::{LineWindow, TextMask};

/// Pen position of every glyph, in order, followed by the total advance.
fn layout<F: FnMut(GlyphId, f32, f32) -> bool>(font: &FontArc, text: &str, pixel_size: f32, mut visit: F) -> f32 {
    let scaled = font.as_scaled(pixel_size);
    let mut caret_x = 0.0f32;
    let mut previous: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret_x += scaled.kern(prev, glyph_id);
        }
        let advance = scaled.h_advance(glyph_id);
        if !visit(glyph_id, caret_x, advance) {
            break;
        }
        caret_x += advance;
        previous = Some(glyph_id);
    }
    caret_x
}

pub(super) fn measure(font: &FontArc, text: &str, pixel_size: f32) -> f32 {
    layout(font, text, pixel_size, |_, _, _| true)
}

pub(super) fn coverage(font: &FontArc, chars: &BTreeSet<char>) -> usize {
    chars.iter().filter(|&&ch| font.glyph_id(ch).0 != 0).count()
}

pub(super) fn render_line(font: &FontArc, text: &str, pixel_size: f32, window: LineWindow) -> TextMask {
    let scaled = font.as_scaled(pixel_size);
    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let advance = measure(font, text, pixel_size);

    let margin = (pixel_size * 0.5).ceil() as usize;
    let mut mask = TextMask::with_em_box(window, advance, ascent - descent, margin);
    let baseline_y = mask.em_top + ascent;
    let pen_x = mask.pen_x;
    let reach = margin as f32;

    layout(font, text, pixel_size, |glyph_id, glyph_x, glyph_advance| {
        if glyph_x > window.end + reach {
            return false;
        }
        if !window.touches(glyph_x, glyph_x + glyph_advance, reach) {
            return true;
        }

        let glyph = glyph_id.with_scale_and_position(pixel_size, point(pen_x + glyph_x, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                mask.accumulate(x, y, coverage);
            });
        }
        true
    });

    mask
}
