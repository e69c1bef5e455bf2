//! # ticket-stamp - Personalized Ticket Image Generator
//!
//! Composites four short text fields (origin, destination, passenger name
//! and date) onto a ticket template image and exports the result as PNG.
//! It provides:
//!
//! - **Layout**: fixed anchors on a 1400×875 canvas, scaled down for mobile
//! - **Text**: centered, bold text from TrueType fonts or a built-in bitmap font
//! - **Lifecycle**: cancellable template loading with deferred generation
//! - **Server**: desktop and mobile form pages plus a PNG endpoint
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticket_stamp::{
//!     config::TicketConfig,
//!     controller::TicketController,
//!     font::FontBook,
//!     form::FormInputs,
//!     loader::AssetLoader,
//!     surface::Canvas,
//! };
//!
//! # async fn example() -> Result<(), ticket_stamp::TicketError> {
//! let config = Arc::new(TicketConfig::default());
//! let fonts = Arc::new(FontBook::from_config(&config)?);
//! let loader = AssetLoader::from_root("public")?;
//!
//! let mut controller = TicketController::desktop(config.clone(), fonts, Canvas::new(1, 1));
//! controller.start_loading(&loader);
//! controller.generate(FormInputs::from_defaults(&config.defaults));
//! controller.settle().await;
//!
//! let download = controller.export(None)?;
//! println!("{}: {} bytes", download.file_name, download.bytes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Canvas size, anchors, styles, defaults, asset paths |
//! | [`layout`] | Viewport scaling and text placements |
//! | [`form`] | Reading the four fields with fallbacks |
//! | [`font`] | TrueType and bitmap text rasterization |
//! | [`compositor`] | Drawing centered text onto pixels |
//! | [`surface`] | Drawing surface abstraction and the in-memory canvas |
//! | [`loader`] | Template image loading with cache-busting |
//! | [`controller`] | Per-platform ticket lifecycle |
//! | [`export`] | PNG encoding and downloads |
//! | [`server`] | HTTP pages and API |
//! | [`error`] | Error types |

pub mod compositor;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod font;
pub mod form;
pub mod layout;
pub mod loader;
pub mod server;
pub mod surface;

// Re-exports for convenience
pub use config::{Platform, TicketConfig};
pub use controller::TicketController;
pub use error::TicketError;
pub use surface::Canvas;
