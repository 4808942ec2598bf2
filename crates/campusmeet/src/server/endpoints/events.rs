//! Public event endpoints. Listing and viewing need no token.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::calendar::{sync_event_to_calendars, SyncAction};
use crate::server::types::{ApiJson, ApiPath, ApiQuery, CurrentUser, MessageResponse};
use crate::services::events::{self, PublicEventFilter, PublicEventRequest};
use crate::types::AppState;

/// GET /api/events/public?school=&category=&from_date=&to_date=&sort=
pub async fn get_public_events(
    State(s): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<PublicEventFilter>,
) -> Response {
    info!("GET /api/events/public");

    match events::public_events(&s.db, &filter) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/events/public
///
/// The new event is pushed to the creator's connected calendars in the background.
pub async fn post_public_event(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<PublicEventRequest>,
) -> Response {
    info!("POST /api/events/public");

    match events::create_public_event(&s.db, &me, &body) {
        Ok(event) => {
            if !s.calendars.is_empty() {
                let state = s.clone();
                let synced = event.clone();
                tokio::spawn(async move {
                    sync_event_to_calendars(&state.calendars, &me, &synced, &SyncAction::Create).await;
                });
            }
            (StatusCode::CREATED, Json(event)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /api/events/:event_id
pub async fn get_event(ApiPath(event_id): ApiPath<String>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /api/events/{}", event_id);

    match events::public_event(&s.db, &event_id) {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/events/:event_id
pub async fn delete_event(
    ApiPath(event_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("DELETE /api/events/{}", event_id);

    match events::remove_event(&s.db, &event_id, &me.id) {
        Ok(_) => (StatusCode::OK, MessageResponse::new("Event deleted")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/events/:event_id/join
pub async fn post_join(
    ApiPath(event_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("POST /api/events/{}/join", event_id);

    match events::join_event(&s.db, &event_id, &me.id) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("Joined event")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/events/:event_id/leave
pub async fn post_leave(
    ApiPath(event_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("POST /api/events/{}/leave", event_id);

    match events::leave_event(&s.db, &event_id, &me.id) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("Left event")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/events/:event_id/attendees
pub async fn get_attendees(ApiPath(event_id): ApiPath<String>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /api/events/{}/attendees", event_id);

    match events::attendees(&s.db, &event_id) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}
