//! Error types shared by the store, the services and the HTTP layer.

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Everything a service operation can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    /// A referenced user, room, event, template or webhook does not exist
    #[error("{0}")]
    NotFound(String),

    /// The request was rejected before any write
    #[error("{0}")]
    Validation(String),

    /// Missing, malformed or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but lacks the required role
    #[error("{0}")]
    Forbidden(String),

    /// The write would duplicate an existing membership, vote key or email
    #[error("{0}")]
    Conflict(String),

    /// Calendar integrations that are declared but not built yet
    #[error("{0}")]
    NotImplemented(String),

    /// A required integration is not configured
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    /// Short label used as the `error` field of the response body.
    pub fn label(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "Not found",
            AppError::Validation(_) => "Invalid request",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Conflict(_) => "Conflict",
            AppError::NotImplemented(_) => "Not implemented",
            AppError::ServiceUnavailable(_) => "Service unavailable",
            AppError::Database(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                "Internal server error"
            }
        }
    }

    /// Returns true when the failure is the server's fault rather than the caller's.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Serialization(_) | AppError::Internal(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Unauthorized(format!("Invalid token: {err}"))
    }
}
