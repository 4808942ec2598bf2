use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::info;

use crate::server::types::CurrentUser;
use crate::services::users;
use crate::types::AppState;

/// GET /api/users/me
pub async fn get_me(State(s): State<Arc<AppState>>, Extension(CurrentUser(me)): Extension<CurrentUser>) -> Response {
    info!("GET /api/users/me");

    match users::get_profile(&s.db, &me.id) {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => e.into_response(),
    }
}
