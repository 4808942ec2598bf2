use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::server::types::{ApiJson, ApiPath, CurrentUser, MessageResponse, WebhookBody};
use crate::services::rooms;
use crate::types::AppState;

/// GET /api/rooms/:room_id/webhooks
pub async fn get_webhooks(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("GET /api/rooms/{}/webhooks", room_id);

    match rooms::webhooks(&s.db, &room_id, &me.id) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/:room_id/webhooks
pub async fn post_webhook(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<WebhookBody>,
) -> Response {
    info!("POST /api/rooms/{}/webhooks", room_id);

    match rooms::add_webhook(&s.db, &room_id, &me.id, &body.url) {
        Ok(hook) => (StatusCode::CREATED, Json(hook)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/rooms/:room_id/webhooks/:webhook_id
pub async fn delete_webhook(
    ApiPath((room_id, webhook_id)): ApiPath<(String, String)>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("DELETE /api/rooms/{}/webhooks/{}", room_id, webhook_id);

    match rooms::remove_webhook(&s.db, &room_id, &webhook_id, &me.id) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("Webhook deleted")).into_response(),
        Err(e) => e.into_response(),
    }
}
