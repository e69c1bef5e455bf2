//! # Ticket Controller
//!
//! Owns one drawing surface and drives it through the ticket lifecycle for a
//! desktop or mobile layout.
//!
//! ## States
//!
//! ```text
//! background:  Idle ──start_loading──▶ Loading ──settle──▶ Ready
//!                                         │
//!                                         └──────settle────▶ Failed
//!
//! generate():  Failed  → alert, surface untouched           (Blocked)
//!              Idle    → remember inputs                    (Deferred)
//!              Loading → remember inputs                    (Deferred)
//!              Ready   → clear, background, four texts      (Drawn)
//! ```
//!
//! Deferred inputs are drawn together with the background as soon as the
//! load resolves, so a half-drawn ticket is never visible.
//!
//! Starting a new load cancels the one in flight; a superseded load can
//! never touch the surface.
//!
//! ## Resizing (mobile)
//!
//! `resize()` recomputes the layout and redraws the background. Whether the
//! text is redrawn too is a [`ResizePolicy`]; the default keeps the browser
//! behavior where text needs an explicit re-generate.

use image::DynamicImage;
use std::sync::Arc;

use crate::config::{Platform, TicketConfig};
use crate::error::TicketError;
use crate::export::Download;
use crate::font::FontBook;
use crate::form::FormInputs;
use crate::layout::{Layout, TextPlacement};
use crate::loader::{AssetLoader, LoadOutcome, PendingLoad};
use crate::surface::Surface;

/// Alert shown when the template image cannot be loaded.
pub const LOAD_FAILED_ALERT: &str = "模板图片加载失败，请检查图片路径是否正确。";

/// Receives user-visible alerts.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        tracing::error!(alert = message, "user alert");
    }
}

/// Background template state.
#[derive(Debug)]
pub enum BackgroundState {
    Idle,
    Loading(PendingLoad),
    Ready(Arc<DynamicImage>),
    Failed(String),
}

/// Copyable view of [`BackgroundState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    /// Nothing requested yet, or the last request was blocked.
    Idle,
    /// Inputs are waiting for the background.
    Deferred,
    /// The last request is fully drawn.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    Drawn,
    Deferred,
    Blocked,
}

/// What happens to the text when the viewport is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizePolicy {
    /// Redraw only the background; text waits for the next generate.
    #[default]
    BackgroundOnly,
    /// Redraw the last generated text at the new scale.
    RedrawText,
}

/// Enabled state of the generate and download buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub generate_enabled: bool,
    pub download_enabled: bool,
}

pub struct TicketController<S: Surface> {
    platform: Platform,
    config: Arc<TicketConfig>,
    fonts: Arc<FontBook>,
    surface: S,
    layout: Layout,
    background: BackgroundState,
    phase: GenerationPhase,
    pending_inputs: Option<FormInputs>,
    last_inputs: Option<FormInputs>,
    drawn: Vec<TextPlacement>,
    resize_policy: ResizePolicy,
    notifier: Arc<dyn Notifier>,
    controls: Controls,
}

impl<S: Surface> TicketController<S> {
    /// Controller for `platform`. `viewport_width` only matters on mobile.
    pub fn new(
        platform: Platform,
        config: Arc<TicketConfig>,
        fonts: Arc<FontBook>,
        mut surface: S,
        viewport_width: f32,
    ) -> Self {
        let layout = Layout::for_platform(&config, platform, viewport_width);
        let (width, height) = layout.pixel_size();
        surface.resize(width, height);
        tracing::debug!(%platform, width, height, scale = layout.scale.scale_factor, "canvas sized");

        Self {
            platform,
            config,
            fonts,
            surface,
            layout,
            background: BackgroundState::Idle,
            phase: GenerationPhase::Idle,
            pending_inputs: None,
            last_inputs: None,
            drawn: Vec::new(),
            resize_policy: ResizePolicy::default(),
            notifier: Arc::new(LogNotifier),
            controls: Controls {
                generate_enabled: true,
                download_enabled: false,
            },
        }
    }

    pub fn desktop(config: Arc<TicketConfig>, fonts: Arc<FontBook>, surface: S) -> Self {
        Self::new(Platform::Desktop, config, fonts, surface, 0.0)
    }

    pub fn mobile(
        config: Arc<TicketConfig>,
        fonts: Arc<FontBook>,
        surface: S,
        viewport_width: f32,
    ) -> Self {
        Self::new(Platform::Mobile, config, fonts, surface, viewport_width)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn status(&self) -> BackgroundStatus {
        match self.background {
            BackgroundState::Idle => BackgroundStatus::Idle,
            BackgroundState::Loading(_) => BackgroundStatus::Loading,
            BackgroundState::Ready(_) => BackgroundStatus::Ready,
            BackgroundState::Failed(_) => BackgroundStatus::Failed,
        }
    }

    /// Why the last load failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        match &self.background {
            BackgroundState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Text placements currently on the surface, in drawing order.
    pub fn drawn(&self) -> &[TextPlacement] {
        &self.drawn
    }

    // ------------------------------------------------------------------
    // Background loading
    // ------------------------------------------------------------------

    /// Start loading this platform's template, cancelling any load in flight.
    pub fn start_loading(&mut self, loader: &AssetLoader) {
        let path = self.config.assets.for_platform(self.platform);
        let pending = loader.spawn(path);
        let previous = std::mem::replace(&mut self.background, BackgroundState::Loading(pending));
        if let BackgroundState::Loading(superseded) = previous {
            superseded.cancel();
        }
    }

    /// Wait for the load in flight, if any, and apply its outcome.
    pub async fn settle(&mut self) {
        let BackgroundState::Loading(pending) =
            std::mem::replace(&mut self.background, BackgroundState::Idle)
        else {
            return;
        };
        match pending.wait().await {
            Some(outcome) => self.apply_load(outcome),
            None => {
                tracing::warn!(platform = %self.platform, "template load ended without a result");
                self.drop_deferred();
            }
        }
    }

    /// Forget inputs waiting for a background that will not arrive.
    fn drop_deferred(&mut self) {
        if self.pending_inputs.take().is_some() {
            self.phase = GenerationPhase::Idle;
            self.controls.generate_enabled = true;
        }
    }

    /// Apply a finished load. Ready draws the background, plus any deferred
    /// inputs. Failed alerts the user.
    pub fn apply_load(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Loaded(image) => {
                self.background = BackgroundState::Ready(image.clone());
                match self.pending_inputs.take() {
                    Some(inputs) => self.draw_ticket(&image, inputs),
                    None => {
                        self.surface.clear();
                        self.surface.draw_background(&image);
                        self.drawn.clear();
                    }
                }
            }
            LoadOutcome::Failed(reason) => {
                self.background = BackgroundState::Failed(reason);
                self.notifier.alert(LOAD_FAILED_ALERT);
                self.drop_deferred();
            }
        }
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Draw the ticket for `inputs`, or defer it until the background is in.
    pub fn generate(&mut self, inputs: FormInputs) -> GenerateOutcome {
        self.controls = Controls {
            generate_enabled: false,
            download_enabled: false,
        };

        let image = match &self.background {
            BackgroundState::Failed(_) => {
                self.notifier.alert(LOAD_FAILED_ALERT);
                self.controls.generate_enabled = true;
                self.phase = GenerationPhase::Idle;
                return GenerateOutcome::Blocked;
            }
            BackgroundState::Idle | BackgroundState::Loading(_) => {
                self.pending_inputs = Some(inputs);
                self.phase = GenerationPhase::Deferred;
                return GenerateOutcome::Deferred;
            }
            BackgroundState::Ready(image) => image.clone(),
        };

        self.draw_ticket(&image, inputs);
        GenerateOutcome::Drawn
    }

    fn draw_ticket(&mut self, image: &DynamicImage, inputs: FormInputs) {
        self.surface.clear();
        self.surface.draw_background(image);
        self.drawn = self.layout.placements(&inputs);
        for placement in &self.drawn {
            self.surface.fill_text(placement, &self.fonts);
        }
        tracing::debug!(platform = %self.platform, fields = self.drawn.len(), "ticket drawn");

        self.last_inputs = Some(inputs);
        self.phase = GenerationPhase::Done;
        self.controls = Controls {
            generate_enabled: true,
            download_enabled: true,
        };
    }

    // ------------------------------------------------------------------
    // Resize & export
    // ------------------------------------------------------------------

    /// React to a new viewport width. Returns `false` on desktop, where the
    /// canvas never changes size.
    pub fn resize(&mut self, viewport_width: f32) -> bool {
        if self.platform != Platform::Mobile {
            return false;
        }

        self.layout = Layout::mobile(&self.config, viewport_width);
        let (width, height) = self.layout.pixel_size();
        self.surface.resize(width, height);
        self.drawn.clear();
        tracing::debug!(width, height, scale = self.layout.scale.scale_factor, "canvas resized");

        if let BackgroundState::Ready(image) = &self.background {
            let image = image.clone();
            match (self.resize_policy, self.last_inputs.take()) {
                (ResizePolicy::RedrawText, Some(inputs)) => self.draw_ticket(&image, inputs),
                (_, last) => {
                    self.last_inputs = last;
                    self.surface.draw_background(&image);
                }
            }
        }
        true
    }

    /// Encode the surface as a PNG download. `None` uses the configured name.
    pub fn export(&self, file_name: Option<&str>) -> Result<Download, TicketError> {
        if !self.controls.download_enabled {
            return Err(TicketError::NothingRendered);
        }
        let file_name = file_name.unwrap_or(&self.config.download_file_name);
        Download::from_surface(&self.surface, file_name)
    }
}
