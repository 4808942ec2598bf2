//! Admin endpoints: user management and template review.
//!
//! Every route here sits behind the admin middleware.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::server::types::{ApiJson, ApiPath, ApiQuery, CurrentUser, MessageResponse, PageQuery, ReviewBody};
use crate::services::timetable::{self, TemplateSubmission};
use crate::services::users::{self, UserUpdate};
use crate::types::AppState;

/// GET /api/admin/users
pub async fn get_users(State(s): State<Arc<AppState>>, ApiQuery(page): ApiQuery<PageQuery>) -> Response {
    info!("GET /api/admin/users");

    match users::list_page(&s.db, page.skip, page.limit) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/admin/users/:user_id
pub async fn get_user(ApiPath(user_id): ApiPath<String>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /api/admin/users/{}", user_id);

    match users::get_profile(&s.db, &user_id) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /api/admin/users/:user_id
pub async fn put_user(
    ApiPath(user_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Response {
    info!("PUT /api/admin/users/{}", user_id);

    match users::admin_update(&s.db, &admin, &user_id, &update) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/admin/users/:user_id
pub async fn delete_user(
    ApiPath(user_id): ApiPath<String>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
) -> Response {
    info!("DELETE /api/admin/users/{}", user_id);

    match users::admin_delete(&s.db, &admin, &user_id) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("User deleted")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/admin/templates/pending
pub async fn get_pending_templates(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /api/admin/templates/pending");

    match timetable::pending_templates(&s.db) {
        Ok(templates) => (StatusCode::OK, Json(templates)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/admin/templates
///
/// Templates created by an admin are approved right away.
pub async fn post_template(
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<TemplateSubmission>,
) -> Response {
    info!("POST /api/admin/templates");

    match timetable::create_approved_template(&s.db, &admin.id, &body) {
        Ok(template) => (StatusCode::CREATED, Json(template)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/admin/templates/:template_id/review
pub async fn post_review_template(
    ApiPath(template_id): ApiPath<i64>,
    State(s): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<ReviewBody>,
) -> Response {
    info!("POST /api/admin/templates/{}/review", template_id);

    match timetable::review_template(&s.db, &admin.id, template_id, &body.status) {
        Ok(template) => (StatusCode::OK, Json(template)).into_response(),
        Err(e) => e.into_response(),
    }
}
