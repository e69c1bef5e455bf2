//! # Layout
//!
//! Resolves a [`TicketConfig`] into concrete draw coordinates for one
//! platform.
//!
//! ## Responsive Sizing
//!
//! ```text
//! width        = min(viewport_width × fraction, max_mobile_width)
//! height       = width × (canonical_height / canonical_width)
//! scale_factor = width / canonical_width
//!
//! For a 390px phone:
//!   width  = min(351, 600) = 351
//!   height = 351 × 0.625   = 219.375
//!   scale  = 351 / 1400    ≈ 0.2507
//! ```
//!
//! Anchors are multiplied by the scale factor exactly. Font sizes are
//! multiplied and rounded to whole pixels. Desktop uses a factor of 1.

use serde::Serialize;

use crate::config::{Anchor, CanvasConfig, Field, Platform, TextStyle, TicketConfig};
use crate::form::FormInputs;

/// Rendered canvas size and its ratio to the canonical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportScale {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl ViewportScale {
    /// Mobile sizing for the given viewport width.
    pub fn compute(canvas: &CanvasConfig, viewport_width: f32) -> Self {
        let width = (viewport_width * canvas.mobile_width_fraction)
            .min(canvas.max_mobile_width)
            .max(0.0);
        Self {
            width,
            height: width * canvas.aspect_ratio(),
            scale_factor: width / canvas.width,
        }
    }

    /// The canonical canvas itself (desktop).
    pub fn canonical(canvas: &CanvasConfig) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            scale_factor: 1.0,
        }
    }

    /// Integer pixel dimensions of the surface (fractional pixels dropped).
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width.floor() as u32).max(1),
            (self.height.floor() as u32).max(1),
        )
    }
}

#[inline]
pub fn scale_anchor(anchor: Anchor, scale_factor: f32) -> Anchor {
    Anchor::new(anchor.x * scale_factor, anchor.y * scale_factor)
}

#[inline]
pub fn scale_font_size(size: f32, scale_factor: f32) -> f32 {
    (size * scale_factor).round()
}

/// One resolved text draw call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPlacement {
    pub field: Field,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub style: TextStyle,
}

/// Draw coordinates and styles for one platform at one size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub platform: Platform,
    pub scale: ViewportScale,
    /// Anchors in the surface's coordinate space, drawing order.
    pub anchors: [(Field, Anchor); 4],
    pub value_style: TextStyle,
    pub label_style: TextStyle,
}

impl Layout {
    pub fn desktop(config: &TicketConfig) -> Self {
        let text = config.text.for_platform(Platform::Desktop);
        Self {
            platform: Platform::Desktop,
            scale: ViewportScale::canonical(&config.canvas),
            anchors: config.anchors.ordered(),
            value_style: text.value.clone(),
            label_style: text.label.clone(),
        }
    }

    pub fn mobile(config: &TicketConfig, viewport_width: f32) -> Self {
        let scale = ViewportScale::compute(&config.canvas, viewport_width);
        let factor = scale.scale_factor;
        let text = config.text.for_platform(Platform::Mobile);
        Self {
            platform: Platform::Mobile,
            scale,
            anchors: config
                .anchors
                .ordered()
                .map(|(field, anchor)| (field, scale_anchor(anchor, factor))),
            value_style: text.value.with_size(scale_font_size(text.value.size, factor)),
            label_style: text.label.with_size(scale_font_size(text.label.size, factor)),
        }
    }

    /// `viewport_width` is ignored on desktop.
    pub fn for_platform(config: &TicketConfig, platform: Platform, viewport_width: f32) -> Self {
        match platform {
            Platform::Desktop => Self::desktop(config),
            Platform::Mobile => Self::mobile(config, viewport_width),
        }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.scale.pixel_size()
    }

    /// The four value draws for `inputs`, in field order.
    pub fn placements(&self, inputs: &FormInputs) -> Vec<TextPlacement> {
        self.anchors
            .iter()
            .map(|(field, anchor)| TextPlacement {
                field: *field,
                text: inputs.get(*field).to_string(),
                x: anchor.x,
                y: anchor.y,
                style: self.value_style.clone(),
            })
            .collect()
    }
}
