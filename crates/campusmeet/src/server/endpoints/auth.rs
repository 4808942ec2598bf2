//! Signup, verification and OTP login endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use crate::server::types::{ApiJson, EmailBody, LoginBody, MessageResponse, RefreshBody, VerifyEmailBody};
use crate::services::auth::{self, SignupRequest};
use crate::types::AppState;

/// POST /api/auth/signup
pub async fn post_signup(State(s): State<Arc<AppState>>, ApiJson(body): ApiJson<SignupRequest>) -> Response {
    info!("POST /api/auth/signup");

    match auth::signup(&s.db, &body) {
        Ok(created) => {
            s.notifier.dispatch(created.notices);
            (StatusCode::CREATED, Json(created.value)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /api/auth/verify-email
pub async fn post_verify_email(State(s): State<Arc<AppState>>, ApiJson(body): ApiJson<VerifyEmailBody>) -> Response {
    info!("POST /api/auth/verify-email");

    match auth::verify_email(&s.db, &body.email, &body.code) {
        Ok(()) => (StatusCode::OK, MessageResponse::new("Email verified")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/auth/request-login-otp
pub async fn post_request_login_otp(State(s): State<Arc<AppState>>, ApiJson(body): ApiJson<EmailBody>) -> Response {
    info!("POST /api/auth/request-login-otp");

    match auth::request_login_otp(&s.db, &body.email) {
        Ok(issued) => {
            s.notifier.dispatch(issued.notices);
            (StatusCode::OK, MessageResponse::new("Login code sent")).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /api/auth/login
pub async fn post_login(State(s): State<Arc<AppState>>, ApiJson(body): ApiJson<LoginBody>) -> Response {
    info!("POST /api/auth/login");

    match auth::login(&s.db, &s.config, &body.email, &body.code) {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/auth/refresh
pub async fn post_refresh(State(s): State<Arc<AppState>>, ApiJson(body): ApiJson<RefreshBody>) -> Response {
    info!("POST /api/auth/refresh");

    match auth::refresh(&s.db, &s.config, &body.refresh_token) {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(e) => e.into_response(),
    }
}
