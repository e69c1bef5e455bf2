//! Ticket rendering handlers.

use axum::{
    Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::{
    config::{Platform, TicketConfig},
    controller::{GenerateOutcome, LOAD_FAILED_ALERT, TicketController},
    export::Download,
    form::{FormInputs, TicketForm},
    surface::Canvas,
};

use super::super::state::AppState;

/// Viewport assumed for mobile requests that don't report one.
pub const DEFAULT_MOBILE_VIEWPORT: f32 = 375.0;

/// Handle POST /api/ticket/:platform - render the ticket and return the PNG.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Form(form): Form<TicketForm>,
) -> Response {
    let platform: Platform = match platform.parse() {
        Ok(platform) => platform,
        Err(e) => return (StatusCode::NOT_FOUND, e).into_response(),
    };

    let request_id = uuid::Uuid::new_v4();
    let inputs = FormInputs::extract(&form, &state.ticket.defaults);
    let viewport = form.viewport_width.unwrap_or(DEFAULT_MOBILE_VIEWPORT);
    tracing::info!(%request_id, %platform, viewport, "ticket requested");

    let mut controller = TicketController::new(
        platform,
        state.ticket.clone(),
        state.fonts.clone(),
        Canvas::new(1, 1),
        viewport,
    );
    controller.start_loading(&state.loader);
    if controller.generate(inputs) == GenerateOutcome::Deferred {
        controller.settle().await;
    }

    if let Some(reason) = controller.failure() {
        tracing::warn!(%request_id, reason, "template unavailable");
        return (StatusCode::BAD_GATEWAY, LOAD_FAILED_ALERT).into_response();
    }

    match controller.export(None) {
        Ok(download) => {
            tracing::info!(%request_id, bytes = download.bytes.len(), "ticket rendered");
            png_response(download)
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render ticket: {}", e),
        )
            .into_response(),
    }
}

fn png_response(download: Download) -> Response {
    (
        [
            (header::CONTENT_TYPE, Download::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, download.content_disposition()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        download.bytes,
    )
        .into_response()
}

/// Handle GET /api/config - the active ticket configuration.
pub async fn config(State(state): State<Arc<AppState>>) -> Json<TicketConfig> {
    Json(state.ticket.as_ref().clone())
}
