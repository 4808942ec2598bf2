use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::server::types::CurrentUser;
use crate::services::auth::authenticate;
use crate::types::AppState;

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return None;
    }
    Some(token.trim().to_string())
}

/// Resolves the bearer access token to an active user and stores it as [`CurrentUser`].
///
/// Requests without a valid token are answered with 401.
pub async fn require_user(State(s): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return AppError::Unauthorized("Missing bearer token".to_string()).into_response();
    };

    match authenticate(&s.db, &s.config, &token) {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Lets only admins through. Must run after [`require_user`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin => next.run(req).await,
        Some(_) => AppError::Forbidden("Admin privileges required".to_string()).into_response(),
        None => AppError::Unauthorized("Not authenticated".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
