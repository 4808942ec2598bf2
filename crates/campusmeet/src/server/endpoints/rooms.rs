//! Room endpoints, including the voted private events that live in a room.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::server::types::{
    ApiJson, ApiPath, ApiQuery, CurrentUser, EmailBody, FreeSlotsQuery, JoinRoomBody, MessageResponse,
};
use crate::services::events::{self, PrivateEventRequest, VoteRequest};
use crate::services::rooms::{self, RoomRequest};
use crate::types::AppState;

/// POST /api/rooms
pub async fn post_room(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<RoomRequest>,
) -> Response {
    info!("POST /api/rooms");

    match rooms::create_room(&s.db, &me, &body) {
        Ok(room) => (StatusCode::CREATED, Json(room)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/rooms
pub async fn get_rooms(State(s): State<Arc<AppState>>, Extension(CurrentUser(me)): Extension<CurrentUser>) -> Response {
    info!("GET /api/rooms");

    match rooms::my_rooms(&s.db, &me.id) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/join
pub async fn post_join(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<JoinRoomBody>,
) -> Response {
    info!("POST /api/rooms/join");

    match rooms::join_room(&s.db, &me, &body.invite_code) {
        Ok(joined) => {
            s.notifier.dispatch(joined.notices);
            (StatusCode::OK, Json(joined.value)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /api/rooms/:room_id
pub async fn get_room(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("GET /api/rooms/{}", room_id);

    match rooms::room_detail(&s.db, &room_id, &me.id) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/rooms/:room_id
pub async fn delete_room(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("DELETE /api/rooms/{}", room_id);

    match rooms::remove_room(&s.db, &room_id, &me.id) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("Room deleted")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/:room_id/invite
pub async fn post_invite(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<EmailBody>,
) -> Response {
    info!("POST /api/rooms/{}/invite", room_id);

    match rooms::invite_by_email(&s.db, &room_id, &me, &body.email) {
        Ok(sent) => {
            s.notifier.dispatch(sent.notices);
            (StatusCode::OK, MessageResponse::new("Invitation sent")).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /api/rooms/:room_id/invite-code
pub async fn get_invite_code(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("GET /api/rooms/{}/invite-code", room_id);

    match rooms::invite_code(&s.db, &room_id, &me.id) {
        Ok(code) => (StatusCode::OK, Json(code)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/:room_id/invite-code/regenerate
pub async fn post_regenerate_invite_code(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("POST /api/rooms/{}/invite-code/regenerate", room_id);

    match rooms::regenerate_invite_code(&s.db, &room_id, &me.id) {
        Ok(code) => (StatusCode::OK, Json(code)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/:room_id/leave
pub async fn post_leave(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("POST /api/rooms/{}/leave", room_id);

    match rooms::leave_room(&s.db, &room_id, &me.id) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("Left room")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/rooms/:room_id/members/free-slots?weekday=&template_id=
pub async fn get_members_free_slots(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<FreeSlotsQuery>,
) -> Response {
    info!("GET /api/rooms/{}/members/free-slots ({})", room_id, query.weekday);

    match rooms::members_free_slots(
        &s.db,
        &room_id,
        &me.id,
        &query.weekday,
        query.template_id,
        &s.config.default_periods,
    ) {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/rooms/:room_id/events
pub async fn get_room_events(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Response {
    info!("GET /api/rooms/{}/events", room_id);

    match events::room_events(&s.db, &room_id, &me.id) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/:room_id/events
pub async fn post_room_event(
    ApiPath(room_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<PrivateEventRequest>,
) -> Response {
    info!("POST /api/rooms/{}/events", room_id);

    match events::create_private_event(&s.db, &room_id, &me, &body) {
        Ok(created) => {
            s.notifier.dispatch(created.notices);
            (StatusCode::CREATED, Json(created.value)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /api/rooms/:room_id/events/:event_id/vote
pub async fn post_vote(
    ApiPath((room_id, event_id)): ApiPath<(String, String)>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<VoteRequest>,
) -> Response {
    info!("POST /api/rooms/{}/events/{}/vote", room_id, event_id);

    match events::vote(&s.db, &room_id, &event_id, &me, &body) {
        Ok(voted) => {
            s.notifier.dispatch(voted.notices);
            (StatusCode::OK, Json(voted.value)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
