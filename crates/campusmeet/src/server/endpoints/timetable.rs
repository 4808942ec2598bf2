use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::server::types::{ApiJson, ApiQuery, CurrentUser, FreeSlotsQuery, TimetableBody};
use crate::services::timetable::{self, TemplateSubmission};
use crate::types::AppState;

/// GET /api/timetable/templates
///
/// Approved templates only. No authentication required.
pub async fn get_templates(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /api/timetable/templates");

    match timetable::approved_templates(&s.db) {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/timetable/templates/submit
pub async fn post_submit_template(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<TemplateSubmission>,
) -> Response {
    info!("POST /api/timetable/templates/submit");

    match timetable::submit_template(&s.db, &me.id, &body) {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/timetable
pub async fn get_timetable(State(s): State<Arc<AppState>>, Extension(CurrentUser(me)): Extension<CurrentUser>) -> Response {
    info!("GET /api/timetable");

    match timetable::get_user_timetable(&s.db, &me.id) {
        Ok(tt) => (StatusCode::OK, Json(tt)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/timetable
pub async fn post_timetable(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<TimetableBody>,
) -> Response {
    info!("POST /api/timetable");

    match timetable::save_user_timetable(&s.db, &me.id, &body.data) {
        Ok(tt) => (StatusCode::OK, Json(tt)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/timetable/free-slots?weekday=&template_id=
pub async fn get_free_slots(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<FreeSlotsQuery>,
) -> Response {
    info!("GET /api/timetable/free-slots ({})", query.weekday);

    match timetable::user_free_slots(
        &s.db,
        &me.id,
        &query.weekday,
        query.template_id,
        &s.config.default_periods,
    ) {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => e.into_response(),
    }
}
