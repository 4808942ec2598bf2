//! Calendar connection endpoints. The OAuth flows are not wired up yet, so these
//! only report that nothing is connected.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::types::AppState;

#[derive(Serialize)]
pub struct CalendarStatus {
    pub google_connected: bool,
    pub apple_connected: bool,
}

const NOT_CONNECTED: CalendarStatus = CalendarStatus {
    google_connected: false,
    apple_connected: false,
};

/// GET /api/calendar/google/status and GET /api/calendar/apple/status
pub async fn get_status() -> Response {
    info!("GET /api/calendar status");
    (StatusCode::OK, Json(NOT_CONNECTED)).into_response()
}

/// GET /api/calendar/google/auth
///
/// 503 when no Google client is configured, 501 otherwise.
pub async fn get_google_auth(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /api/calendar/google/auth");

    if s.config.google.client_id.is_none() {
        return AppError::ServiceUnavailable("Google Calendar is not configured".to_string()).into_response();
    }
    AppError::NotImplemented("Google Calendar OAuth is not implemented yet".to_string()).into_response()
}

/// GET /api/calendar/google/callback
pub async fn get_google_callback() -> Response {
    info!("GET /api/calendar/google/callback");
    AppError::NotImplemented("Google Calendar OAuth is not implemented yet".to_string()).into_response()
}

/// POST /api/calendar/apple/connect
pub async fn post_apple_connect() -> Response {
    info!("POST /api/calendar/apple/connect");
    AppError::NotImplemented("Apple Calendar sync is not implemented yet".to_string()).into_response()
}
