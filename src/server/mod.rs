//! # HTTP Server for Ticket Generation
//!
//! Serves the desktop and mobile form pages and renders tickets on demand.
//!
//! ## Usage
//!
//! ```bash
//! ticket-stamp serve --listen 0.0.0.0:8080 --assets ./public
//! ```
//!
//! Then open http://localhost:8080 (desktop) or http://localhost:8080/mobile.
//!
//! ## Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | desktop form |
//! | GET | `/mobile` | mobile form |
//! | POST | `/api/ticket/:platform` | PNG attachment, 502 if the template fails |
//! | GET | `/api/config` | active ticket config as JSON |

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::TicketConfig;
use crate::error::TicketError;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::pages::desktop))
        .route("/mobile", get(handlers::pages::mobile))
        .route("/api/ticket/:platform", post(handlers::ticket::generate))
        .route("/api/config", get(handlers::ticket::config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use ticket_stamp::config::TicketConfig;
/// use ticket_stamp::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), ticket_stamp::error::TicketError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     asset_root: "public".to_string(),
/// };
///
/// serve(config, TicketConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig, ticket: TicketConfig) -> Result<(), TicketError> {
    let app_state = Arc::new(AppState::from_config(&config, ticket)?);
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            TicketError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    tracing::info!(listen = %config.listen_addr, assets = %config.asset_root, "ticket-stamp listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| TicketError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}
