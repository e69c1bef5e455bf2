//! Built-in bitmap font (Spleen), scaled to any pixel size.
//!
//! Spleen 12×24 is the master; sizes of 14px and below sample the 6×12 cut
//! instead, which holds up better when shrunk. Every character occupies one
//! cell of `cell_width × pixel_size`. Characters Spleen does not cover (CJK
//! included) draw as a box with the code point's low 16 bits as a 4×4 dot
//! grid inside, when the cut is large enough to hold one.

use spleen_font::{FONT_6X12, FONT_12X24, PSF2Font};
use std::collections::BTreeSet;

use super::{LineWindow, TextMask};

struct Cut {
    data: &'static [u8],
    width: usize,
    height: usize,
}

impl Cut {
    fn for_size(pixel_size: f32) -> Self {
        if pixel_size <= 14.0 {
            Self {
                data: FONT_6X12,
                width: 6,
                height: 12,
            }
        } else {
            Self {
                data: FONT_12X24,
                width: 12,
                height: 24,
            }
        }
    }

    fn cell_width(&self, pixel_size: f32) -> f32 {
        self.width as f32 * pixel_size / self.height as f32
    }
}

pub(super) fn measure(text: &str, pixel_size: f32) -> f32 {
    let pixel_size = pixel_size.max(1.0);
    Cut::for_size(pixel_size).cell_width(pixel_size) * text.chars().count() as f32
}

pub(super) fn coverage(chars: &BTreeSet<char>) -> usize {
    let Ok(mut font) = PSF2Font::new(FONT_12X24) else {
        return 0;
    };
    chars
        .iter()
        .filter(|ch| font.glyph_for_utf8(ch.to_string().as_bytes()).is_some())
        .count()
}

pub(super) fn render_line(text: &str, pixel_size: f32, window: LineWindow) -> TextMask {
    let pixel_size = pixel_size.max(1.0);
    let cut = &Cut::for_size(pixel_size);
    let cell_width = cut.cell_width(pixel_size);

    let advance = cell_width * text.chars().count() as f32;
    let margin = 1;
    let mut mask = TextMask::with_em_box(window, advance, pixel_size, margin);

    let mut font = PSF2Font::new(cut.data).ok();
    let cell_w = cell_width.round().max(1.0) as usize;
    let cell_h = pixel_size.round().max(1.0) as usize;
    let reach = margin as f32;

    for (i, ch) in text.chars().enumerate() {
        let cell_x = cell_width * i as f32;
        if cell_x > window.end + reach {
            break;
        }
        if !window.touches(cell_x, cell_x + cell_width, reach) {
            continue;
        }

        let bitmap = font
            .as_mut()
            .and_then(|f| glyph_bitmap(f, ch, cut))
            .unwrap_or_else(|| box_bitmap(cut.width, cut.height, ch));

        let origin_x = (mask.pen_x + cell_x).round() as i32;
        let origin_y = mask.em_top as i32;

        // Nearest neighbor from the source cell to the scaled cell
        for dy in 0..cell_h {
            let sy = (dy * cut.height / cell_h).min(cut.height - 1);
            for dx in 0..cell_w {
                let sx = (dx * cut.width / cell_w).min(cut.width - 1);
                if bitmap[sy * cut.width + sx] {
                    mask.accumulate(origin_x + dx as i32, origin_y + dy as i32, 1.0);
                }
            }
        }
    }

    mask
}

fn glyph_bitmap(font: &mut PSF2Font, ch: char, cut: &Cut) -> Option<Vec<bool>> {
    let utf8 = ch.to_string();
    let glyph = font.glyph_for_utf8(utf8.as_bytes())?;
    let mut bitmap = vec![false; cut.width * cut.height];
    for (row_y, row) in glyph.enumerate() {
        for (col_x, on) in row.enumerate() {
            if row_y < cut.height && col_x < cut.width {
                bitmap[row_y * cut.width + col_x] = on;
            }
        }
    }
    Some(bitmap)
}

/// Box outline inset by one pixel, for characters the font lacks. Inside
/// it, bit 15..0 of the code point fill a 4×4 grid, most significant first.
fn box_bitmap(width: usize, height: usize, ch: char) -> Vec<bool> {
    let mut bitmap = vec![false; width * height];
    let (left, right) = (1, width - 2);
    let (top, bottom) = (height / 6, height - height / 6 - 1);
    for x in left..=right {
        bitmap[top * width + x] = true;
        bitmap[bottom * width + x] = true;
    }
    for y in top..=bottom {
        bitmap[y * width + left] = true;
        bitmap[y * width + right] = true;
    }

    let (inner_x, inner_y) = (left + 2, top + 2);
    let dot_w = (right - left).saturating_sub(3) / 4;
    let dot_h = (bottom - top).saturating_sub(3) / 4;
    if dot_w == 0 || dot_h == 0 {
        return bitmap;
    }

    let code = ch as u32;
    for bit in 0..16 {
        if code >> (15 - bit) & 1 == 0 {
            continue;
        }
        let (col, row) = (bit % 4, bit / 4);
        for y in 0..dot_h {
            for x in 0..dot_w {
                let px = inner_x + col * dot_w + x;
                let py = inner_y + row * dot_h + y;
                bitmap[py * width + px] = true;
            }
        }
    }
    bitmap
}
