use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::db::types::DbUser;
use crate::error::AppError;
use crate::schedule::WeeklyTimetable;

/// The JSON error body every failed request answers with.
pub struct ApiErrorType {
    status: StatusCode,
    error: String,
    context: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, error, context): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            error: error.to_string(),
            context,
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.error,
                "context": self.context,
            })),
        )
            .into_response()
    }
}

fn status_of(err: &AppError) -> StatusCode {
    match err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Database(_) | AppError::Serialization(_) | AppError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        if self.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{} {}", status.as_u16(), self);
        }
        ApiErrorType::from((status, self.label(), Some(self.to_string()))).into_response()
    }
}

/// Client-side rejections become `Validation`, anything else `Internal`.
fn rejected(status: StatusCode, detail: String) -> AppError {
    if status.is_server_error() {
        AppError::Internal(detail)
    } else {
        AppError::Validation(detail)
    }
}

/// [`Json`] whose rejections are [`AppError::Validation`].
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(e) => Err(rejected(e.status(), e.body_text())),
        }
    }
}

/// [`Query`] whose rejections are [`AppError::Validation`].
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(e) => Err(rejected(e.status(), e.body_text())),
        }
    }
}

/// [`Path`] whose rejections are [`AppError::Validation`].
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(e) => Err(rejected(e.status(), e.body_text())),
        }
    }
}

/// The authenticated caller, put into request extensions by the auth middleware.
#[derive(Clone)]
pub struct CurrentUser(pub DbUser);

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Deserialize)]
pub struct VerifyEmailBody {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct EmailBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct TimetableBody {
    pub data: WeeklyTimetable,
}

#[derive(Deserialize)]
pub struct FreeSlotsQuery {
    pub weekday: String,
    pub template_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct ReviewBody {
    pub status: String,
}

#[derive(Deserialize)]
pub struct JoinRoomBody {
    pub invite_code: String,
}

#[derive(Deserialize)]
pub struct WebhookBody {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(&AppError::not_found("Room")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&AppError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(&AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(&AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let response = AppError::Validation("Invalid vote value: absolutely".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
