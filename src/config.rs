//! # Ticket Configuration
//!
//! Static, declarative data describing how a ticket is drawn: text styles per
//! platform, the canonical canvas, where each field sits, what to print when a
//! field is left empty, and which template image to use.
//!
//! ## Built-in Layout
//!
//! | Field | Anchor (canonical) | Default |
//! |-------|--------------------|---------|
//! | Origin | (1210, 192) | 未填写 |
//! | Destination | (1210, 369) | 未填写 |
//! | Name | (1210, 545) | 未填写 |
//! | Date | (1210, 752) | 未知时间 |
//!
//! Anchors live in the canonical 1400×875 space. The mobile layout scales
//! them; the desktop layout uses them as-is.
//!
//! ## Usage
//!
//! ```
//! use ticket_stamp::config::{Field, TicketConfig};
//!
//! let config = TicketConfig::default();
//! let origin = config.anchors.get(Field::Origin);
//! assert_eq!((origin.x, origin.y), (1210.0, 192.0));
//! ```
//!
//! A JSON file may override any subset of fields; everything missing keeps
//! the built-in value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::TicketError;

// ============================================================================
// PLATFORM & FIELDS
// ============================================================================

/// Which layout variant a ticket is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Fixed canonical-size canvas.
    Desktop,
    /// Canvas sized from the viewport width.
    Mobile,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "desktop" | "pc" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            other => Err(format!(
                "Unknown platform '{}'. Use 'desktop' or 'mobile'",
                other
            )),
        }
    }
}

/// One of the four text fields on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Origin,
    Destination,
    Name,
    Date,
}

impl Field {
    /// All fields in drawing order.
    pub const ALL: [Field; 4] = [Field::Origin, Field::Destination, Field::Name, Field::Date];

    /// Form key the field is submitted under.
    pub fn form_key(&self) -> &'static str {
        match self {
            Self::Origin => "startPlace",
            Self::Destination => "endPlace",
            Self::Name => "name",
            Self::Date => "date",
        }
    }
}

// ============================================================================
// TEXT STYLES
// ============================================================================

/// Font, weight, size and color for one kind of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font family name, looked up in the font book.
    pub font: String,
    /// CSS-like weight keyword (`normal`, `bold`).
    pub weight: String,
    /// Pixel size.
    pub size: f32,
    /// Hex color (`#rrggbb` or `#rgb`).
    pub color: String,
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        matches!(self.weight.as_str(), "bold" | "bolder" | "700" | "800" | "900")
    }

    /// Same style at a different pixel size.
    pub fn with_size(&self, size: f32) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }
}

/// Label and value styles for one platform.
///
/// Labels share the value font; only size and color differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformText {
    pub label: TextStyle,
    pub value: TextStyle,
}

impl PlatformText {
    fn with_font(font: &str) -> Self {
        Self {
            label: TextStyle {
                font: font.to_string(),
                weight: "bold".to_string(),
                size: 22.0,
                color: "#5a3921".to_string(),
            },
            value: TextStyle {
                font: font.to_string(),
                weight: "bold".to_string(),
                size: 32.0,
                color: "#000000".to_string(),
            },
        }
    }
}

/// Per-platform text styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub desktop: PlatformText,
    pub mobile: PlatformText,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            desktop: PlatformText::with_font("HYShangWeiShouShuW"),
            mobile: PlatformText::with_font("cursive"),
        }
    }
}

impl TextConfig {
    pub fn for_platform(&self, platform: Platform) -> &PlatformText {
        match platform {
            Platform::Desktop => &self.desktop,
            Platform::Mobile => &self.mobile,
        }
    }
}

// ============================================================================
// CANVAS & ANCHORS
// ============================================================================

/// Canonical canvas dimensions and the mobile sizing rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
    /// Upper bound for the mobile render width.
    pub max_mobile_width: f32,
    /// Fraction of the viewport width the mobile canvas takes.
    pub mobile_width_fraction: f32,
}

impl CanvasConfig {
    /// The 1400×875 canonical canvas.
    pub const CANONICAL: Self = Self {
        width: 1400.0,
        height: 875.0,
        max_mobile_width: 600.0,
        mobile_width_fraction: 0.9,
    };

    /// Height over width of the canonical canvas.
    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.height / self.width
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Center point of one text field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The four field anchors in canonical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Anchors {
    pub origin: Anchor,
    pub destination: Anchor,
    pub name: Anchor,
    pub date: Anchor,
}

impl Default for Anchors {
    fn default() -> Self {
        Self {
            origin: Anchor::new(1210.0, 192.0),
            destination: Anchor::new(1210.0, 369.0),
            name: Anchor::new(1210.0, 545.0),
            date: Anchor::new(1210.0, 752.0),
        }
    }
}

impl Anchors {
    pub fn get(&self, field: Field) -> Anchor {
        match field {
            Field::Origin => self.origin,
            Field::Destination => self.destination,
            Field::Name => self.name,
            Field::Date => self.date,
        }
    }

    /// Anchors paired with their field, in drawing order.
    pub fn ordered(&self) -> [(Field, Anchor); 4] {
        Field::ALL.map(|field| (field, self.get(field)))
    }
}

// ============================================================================
// DEFAULTS, ASSETS
// ============================================================================

/// Text printed when a form field is left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldDefaults {
    pub start_place: String,
    pub end_place: String,
    pub name: String,
    pub date: String,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            start_place: "未填写".to_string(),
            end_place: "未填写".to_string(),
            name: "未填写".to_string(),
            date: "未知时间".to_string(),
        }
    }
}

impl FieldDefaults {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Origin => &self.start_place,
            Field::Destination => &self.end_place,
            Field::Name => &self.name,
            Field::Date => &self.date,
        }
    }
}

/// Template image path for each platform, relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub desktop: String,
    pub mobile: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            desktop: "images/template-bg.png".to_string(),
            mobile: "images/template-bg-mobile.png".to_string(),
        }
    }
}

impl AssetPaths {
    pub fn for_platform(&self, platform: Platform) -> &str {
        match platform {
            Platform::Desktop => &self.desktop,
            Platform::Mobile => &self.mobile,
        }
    }
}

// ============================================================================
// TICKET CONFIG
// ============================================================================

/// Default name for the exported PNG.
pub const DEFAULT_FILE_NAME: &str = "custom-image.png";

/// Everything needed to lay out and draw a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    pub text: TextConfig,
    pub canvas: CanvasConfig,
    pub anchors: Anchors,
    pub defaults: FieldDefaults,
    pub assets: AssetPaths,
    pub download_file_name: String,
    /// Font family name → TrueType file. Families not listed fall back to
    /// installed fonts, then to the built-in bitmap font.
    pub fonts: BTreeMap<String, PathBuf>,
    /// Look up installed fonts for families without a file, and for
    /// characters the chosen font lacks.
    pub system_fonts: bool,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            text: TextConfig::default(),
            canvas: CanvasConfig::default(),
            anchors: Anchors::default(),
            defaults: FieldDefaults::default(),
            assets: AssetPaths::default(),
            download_file_name: DEFAULT_FILE_NAME.to_string(),
            fonts: BTreeMap::new(),
            system_fonts: true,
        }
    }
}

impl TicketConfig {
    /// Read a JSON config file. Missing keys keep their built-in values.
    pub fn load(path: &Path) -> Result<Self, TicketError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TicketError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
            .map_err(|e| TicketError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// ============================================================================
// TESTS
// ============================================================================
