use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure categories surfaced to API clients.
///
/// Every domain failure is one of these kinds; the HTTP status is derived
/// from the kind alone in [`ErrorKind::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials, invalid token, or a token bound to another account
    Authentication,
    /// Account is blocked or soft-deleted (refresh flow only)
    AccountUnavailable,
    /// Request refused regardless of identity (e.g. unrecognized origin)
    Forbidden,
    AlreadyVerified,
    Conflict,
    TooManyRequests,
    NotFound,
    Validation,
    Internal,
}

impl ErrorKind {
    /// | ErrorKind          | Status |
    /// |--------------------|--------|
    /// | Authentication     | 401    |
    /// | AccountUnavailable | 403    |
    /// | Forbidden          | 403    |
    /// | AlreadyVerified    | 409    |
    /// | Conflict           | 409    |
    /// | TooManyRequests    | 429    |
    /// | NotFound           | 404    |
    /// | Validation         | 400    |
    /// | Internal           | 500    |
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::AccountUnavailable | ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::AlreadyVerified | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication_failed",
            ErrorKind::AccountUnavailable => "account_unavailable",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AlreadyVerified => "already_verified",
            ErrorKind::Conflict => "conflict",
            ErrorKind::TooManyRequests => "too_many_requests",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

#[derive(Error, Debug)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub field: Option<String>,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    /// Generic credential failure. Never says which field was wrong.
    pub fn authentication() -> Self {
        Self::new(
            ErrorKind::Authentication,
            Some("credentials"),
            "Invalid email or password",
        )
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            ErrorKind::Authentication,
            Some("token"),
            "Authentication required",
        )
    }

    pub fn account_unavailable() -> Self {
        Self::new(
            ErrorKind::AccountUnavailable,
            Some("account"),
            "Account is blocked or deleted",
        )
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, Some(field), message)
    }

    pub fn not_found(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, Some(field), message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, None, message)
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::internal(format!("Database error: {}", err))
    }
}

impl From<crate::repositories::RepositoryError> for AppError {
    fn from(err: crate::repositories::RepositoryError) -> Self {
        use crate::repositories::RepositoryError;
        match err {
            RepositoryError::NotFound => AppError::not_found("account", "Account not found"),
            RepositoryError::AlreadyExists => {
                AppError::new(ErrorKind::Conflict, Some("email"), "Email already registered")
            }
            RepositoryError::Database(e) => e.into(),
        }
    }
}

impl From<crate::cache::CacheError> for AppError {
    fn from(err: crate::cache::CacheError) -> Self {
        AppError::internal(format!("Cache error: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs
        let message = if self.kind == ErrorKind::Internal {
            tracing::error!("Internal error: {}", self.message);
            "Internal server error".to_string()
        } else {
            self.message
        };

        let body = json!({
            "error": self.kind.code(),
            "field": self.field,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
