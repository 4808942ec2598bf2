use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// GET /
pub async fn get_root() -> Response {
    (StatusCode::OK, Json(json!({ "message": "CampusMeet API" }))).into_response()
}

/// GET /health
///
/// Reports whether the database answers queries.
pub async fn get_health(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /health");

    match s.db.health_check() {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(e) => ApiErrorType::from((
            StatusCode::SERVICE_UNAVAILABLE,
            "Database unavailable",
            Some(e.to_string()),
        ))
        .into_response(),
    }
}
