//! # Fonts
//!
//! Text is rasterized into a [`TextMask`]: an anti-aliased coverage buffer
//! laid out around the line's em box, so callers can center it without
//! knowing which backend produced it.
//!
//! ## Backends
//!
//! | Backend | Source | Coverage |
//! |---------|--------|----------|
//! | [`FontFace::Ttf`] | TrueType file or installed font via `ab_glyph` | anti-aliased |
//! | [`FontFace::Bitmap`] | built-in Spleen 12×24 / 6×12 | 0 or 1 |
//!
//! ## Face Selection
//!
//! [`FontBook::face_for`] picks, for one line of text, the first face that
//! has every character:
//!
//! 1. the file registered for the family (or the installed font of that name)
//! 2. installed fallbacks, CJK families first
//! 3. the built-in bitmap font
//!
//! If none has every character, the one covering the most wins. Characters
//! the bitmap font lacks are drawn as a box holding the code point's low 16
//! bits, so different characters never look the same.
//!
//! ## Mask Geometry
//!
//! ```text
//!  ┌──────────────────────────────┐
//!  │ margin                       │
//!  │   ┌──────────────────────┐   │  em_top
//!  │   │ ascent               │   │
//!  │   │─ ─ ─ baseline ─ ─ ─ ─│   │
//!  │   │ descent              │   │
//!  │   └──────────────────────┘   │  em_top + em_height
//!  │ window.start   window.end    │
//!  └──────────────────────────────┘
//! ```
//!
//! Only the [`LineWindow`] of the line is rasterized, so a long line costs
//! no more memory than the surface it lands on.

mod bitmap;
mod ttf;

use ab_glyph::{FontArc, FontVec};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::config::TicketConfig;
use crate::error::TicketError;

/// Installed families tried for characters the chosen face lacks.
const FALLBACK_FAMILIES: &[&str] = &[
    "Noto Sans CJK SC",
    "Noto Serif CJK SC",
    "Source Han Sans SC",
    "Source Han Serif SC",
    "WenQuanYi Micro Hei",
    "WenQuanYi Zen Hei",
    "AR PL UMing CN",
    "PingFang SC",
    "Hiragino Sans GB",
    "Microsoft YaHei",
    "SimHei",
    "SimSun",
];

// ============================================================================
// MASK
// ============================================================================

/// Span of a line that should be rasterized, in line coordinates: 0 is
/// where the pen starts, the line's advance is where it ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineWindow {
    pub start: f32,
    pub end: f32,
}

impl LineWindow {
    /// The whole line.
    pub fn full(advance: f32) -> Self {
        Self {
            start: 0.0,
            end: advance.max(0.0),
        }
    }

    /// The part of a line starting at surface x `line_left` that falls on
    /// `0..surface_width`, or `None` if none of it does.
    pub fn visible(advance: f32, line_left: f32, surface_width: f32) -> Option<Self> {
        let start = (-line_left).max(0.0);
        let end = (surface_width - line_left).min(advance);
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Whether `[x0, x1]` touches the window widened by `margin`.
    #[inline]
    pub fn touches(&self, x0: f32, x1: f32, margin: f32) -> bool {
        x1 >= self.start - margin && x0 <= self.end + margin
    }
}

/// Rasterized single line of text.
#[derive(Debug, Clone)]
pub struct TextMask {
    pub width: usize,
    pub height: usize,
    /// Coverage: 0.0 = empty, 1.0 = fully inked.
    pub data: Vec<f32>,
    /// Horizontal advance of the whole line.
    pub advance: f32,
    /// Height of the em box (ascent − descent).
    pub em_height: f32,
    /// Mask x of the line's pen start. Negative when the window skips the
    /// beginning of the line.
    pub pen_x: f32,
    /// Mask y of the em box top.
    pub em_top: f32,
}

impl TextMask {
    /// Empty mask covering `window` of the line plus a margin on every side
    /// for overhanging glyphs.
    pub(crate) fn with_em_box(window: LineWindow, advance: f32, em_height: f32, margin: usize) -> Self {
        let span = (window.end - window.start).ceil().max(0.0) as usize;
        let width = span + 2 * margin;
        let height = em_height.ceil().max(0.0) as usize + 2 * margin;
        Self {
            width,
            height,
            data: vec![0.0; width * height],
            advance,
            em_height,
            pen_x: margin as f32 - window.start,
            em_top: margin as f32,
        }
    }

    #[inline]
    pub fn coverage(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Add coverage at integer mask coordinates, clamped to 1.0.
    #[inline]
    pub(crate) fn accumulate(&mut self, x: i32, y: i32, coverage: f32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let idx = y as usize * self.width + x as usize;
            self.data[idx] = (self.data[idx] + coverage).min(1.0);
        }
    }

    /// Synthetic bold: smear coverage `stroke` pixels to the right. The mask
    /// grows by `stroke` columns so the smear is never cut off.
    pub fn embolden(&mut self, stroke: usize) {
        if stroke == 0 || self.width == 0 {
            return;
        }
        let width = self.width + stroke;
        let mut data = vec![0.0f32; width * self.height];
        for y in 0..self.height {
            let source = &self.data[y * self.width..(y + 1) * self.width];
            let row = &mut data[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let from = x.saturating_sub(stroke);
                let to = x.min(self.width - 1);
                if from <= to {
                    *out = source[from..=to].iter().fold(0.0f32, |acc, &c| acc.max(c));
                }
            }
        }
        self.width = width;
        self.data = data;
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&c| c == 0.0)
    }
}

// ============================================================================
// FACES
// ============================================================================

/// One loaded font family.
#[derive(Clone)]
pub enum FontFace {
    Ttf(FontArc),
    Bitmap,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ttf(_) => f.write_str("FontFace::Ttf"),
            Self::Bitmap => f.write_str("FontFace::Bitmap"),
        }
    }
}

impl FontFace {
    pub fn from_file(path: &Path) -> Result<Self, TicketError> {
        let bytes = std::fs::read(path).map_err(|e| {
            TicketError::Font(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TicketError> {
        FontArc::try_from_vec(bytes)
            .map(Self::Ttf)
            .map_err(|e| TicketError::Font(format!("Invalid font data: {}", e)))
    }

    /// Horizontal advance of `text` at `pixel_size`.
    pub fn measure(&self, text: &str, pixel_size: f32) -> f32 {
        match self {
            Self::Ttf(font) => ttf::measure(font, text, pixel_size),
            Self::Bitmap => bitmap::measure(text, pixel_size),
        }
    }

    /// Rasterize the part of `text` inside `window` at `pixel_size`.
    pub fn render_line(&self, text: &str, pixel_size: f32, window: LineWindow) -> TextMask {
        match self {
            Self::Ttf(font) => ttf::render_line(font, text, pixel_size, window),
            Self::Bitmap => bitmap::render_line(text, pixel_size, window),
        }
    }

    /// How many of `chars` this face has a glyph for.
    pub fn coverage(&self, chars: &BTreeSet<char>) -> usize {
        match self {
            Self::Ttf(font) => ttf::coverage(font, chars),
            Self::Bitmap => bitmap::coverage(chars),
        }
    }
}

// ============================================================================
// FONT BOOK
// ============================================================================

/// Font family name → face, plus installed fallbacks.
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    faces: HashMap<String, FontFace>,
    fallbacks: Vec<FontFace>,
}

static BITMAP: FontFace = FontFace::Bitmap;

impl FontBook {
    /// A book with no registered families and no installed fallbacks;
    /// everything draws with the bitmap font.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every font file listed in the config, look up installed fonts
    /// when enabled, and warn about styles whose family has no face.
    pub fn from_config(config: &TicketConfig) -> Result<Self, TicketError> {
        let mut book = Self::new();
        for (family, path) in &config.fonts {
            book.register_file(family, path)?;
        }

        let text = &config.text;
        let styles = [
            &text.desktop.value,
            &text.desktop.label,
            &text.mobile.value,
            &text.mobile.label,
        ];

        if config.system_fonts {
            let families: BTreeSet<&str> = styles.iter().map(|s| s.font.as_str()).collect();
            book.load_system_fonts(&families.into_iter().collect::<Vec<_>>());
        }

        for style in styles {
            if !book.contains(&style.font) {
                tracing::warn!(family = %style.font, "no font registered, using fallbacks");
            }
        }
        Ok(book)
    }

    pub fn register(&mut self, family: &str, face: FontFace) {
        self.faces.insert(family.to_string(), face);
    }

    pub fn register_file(&mut self, family: &str, path: &Path) -> Result<(), TicketError> {
        let face = FontFace::from_file(path)?;
        tracing::info!(family, path = %path.display(), "font loaded");
        self.register(family, face);
        Ok(())
    }

    /// Index installed fonts. Each of `families` without a registered face
    /// gets the installed font of that name, if any. Installed CJK and
    /// generic families become fallbacks.
    pub fn load_system_fonts(&mut self, families: &[&str]) {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "system fonts indexed");

        for &family in families {
            if self.contains(family) {
                continue;
            }
            let Some(id) = query(&db, css_family(family)) else {
                continue;
            };
            if let Some(face) = load_face(&db, id) {
                tracing::info!(family, "using installed font");
                self.register(family, face);
            }
        }

        let mut seen = HashSet::new();
        let candidates = FALLBACK_FAMILIES
            .iter()
            .map(|&name| fontdb::Family::Name(name))
            .chain([fontdb::Family::SansSerif, fontdb::Family::Serif]);
        for family in candidates {
            let Some(id) = query(&db, family) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            if let Some(face) = load_face(&db, id) {
                self.fallbacks.push(face);
            }
        }
        tracing::info!(fallbacks = self.fallbacks.len(), "installed fallback fonts");
    }

    pub fn contains(&self, family: &str) -> bool {
        self.faces.contains_key(family)
    }

    pub fn fallback_count(&self) -> usize {
        self.fallbacks.len()
    }

    /// Face registered for `family`, or the bitmap font.
    pub fn face(&self, family: &str) -> &FontFace {
        self.faces.get(family).unwrap_or(&BITMAP)
    }

    /// Face to draw `text` in for `family`: the first candidate with every
    /// character, else the one with the most.
    pub fn face_for(&self, family: &str, text: &str) -> &FontFace {
        let chars: BTreeSet<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        let candidates = self
            .faces
            .get(family)
            .into_iter()
            .chain(self.fallbacks.iter())
            .chain(std::iter::once(&BITMAP));

        let mut best: Option<(&FontFace, usize)> = None;
        for face in candidates {
            let covered = face.coverage(&chars);
            if covered == chars.len() {
                return face;
            }
            if best.is_none_or(|(_, most)| covered > most) {
                best = Some((face, covered));
            }
        }
        best.map_or(&BITMAP, |(face, _)| face)
    }
}

/// CSS generic names map to fontdb's generic families.
fn css_family(name: &str) -> fontdb::Family<'_> {
    match name {
        "serif" => fontdb::Family::Serif,
        "sans-serif" => fontdb::Family::SansSerif,
        "cursive" => fontdb::Family::Cursive,
        "fantasy" => fontdb::Family::Fantasy,
        "monospace" => fontdb::Family::Monospace,
        _ => fontdb::Family::Name(name),
    }
}

fn query(db: &fontdb::Database, family: fontdb::Family<'_>) -> Option<fontdb::ID> {
    db.query(&fontdb::Query {
        families: &[family],
        ..Default::default()
    })
}

fn load_face(db: &fontdb::Database, id: fontdb::ID) -> Option<FontFace> {
    let loaded = db.with_face_data(id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index)
    })?;
    match loaded {
        Ok(font) => Some(FontFace::Ttf(FontArc::new(font))),
        Err(e) => {
            tracing::warn!(error = %e, "unusable installed font");
            None
        }
    }
}
