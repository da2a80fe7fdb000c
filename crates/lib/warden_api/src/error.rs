//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};
use warden_core::auth::AuthError;
use warden_core::authz::AuthzError;
use warden_core::ratelimit::RateLimitError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Messages of `Unauthorized`, `Forbidden` and `Validation` reach the client;
/// the detail carried by `ServiceUnavailable` and `Internal` is only logged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests",
            ),
            AppError::ServiceUnavailable(detail) => {
                warn!(detail = %detail, "request denied: dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "Service temporarily unavailable",
                )
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Expired => AppError::Unauthorized("Token expired".into()),
            AuthError::Malformed(detail) => {
                tracing::debug!(detail = %detail, "rejected malformed token");
                AppError::Unauthorized("Invalid token".into())
            }
            AuthError::WrongKind { .. } => AppError::Unauthorized("Invalid token type".into()),
            AuthError::Tamper => AppError::Unauthorized("Invalid token".into()),
            AuthError::Revoked | AuthError::AlreadyRevoked => {
                AppError::Unauthorized("Token revoked".into())
            }
            AuthError::BackingStore(detail) => AppError::ServiceUnavailable(detail),
            AuthError::Signing(detail) | AuthError::Config(detail) => AppError::Internal(detail),
        }
    }
}

impl From<AuthzError> for AppError {
    fn from(e: AuthzError) -> Self {
        match e {
            AuthzError::NotReady => AppError::ServiceUnavailable("policy engine not loaded".into()),
            AuthzError::BackingStore(detail) => AppError::ServiceUnavailable(detail),
            AuthzError::Persistence(detail) => AppError::Internal(detail),
            AuthzError::Invalid(msg) => AppError::Validation(msg),
        }
    }
}

/// Failure to assemble [`crate::AppState`] at startup.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
}
