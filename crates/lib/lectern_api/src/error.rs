//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lectern_core::auth::AuthError;
use lectern_core::classroom::ClassroomError;
use lectern_core::store::StoreError;
use thiserror::Error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Missing or unverifiable bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::InvalidCredentials(m) => {
                (StatusCode::BAD_REQUEST, "invalid_credentials", m.as_str())
            }
            AppError::InvalidToken(m) => (StatusCode::BAD_REQUEST, "invalid_token", m.as_str()),
            AppError::InvalidOperation(m) => {
                (StatusCode::BAD_REQUEST, "invalid_operation", m.as_str())
            }
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::BadGateway(m) => (StatusCode::BAD_GATEWAY, "delivery_failure", m.as_str()),
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
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

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials(e.to_string()),
            AuthError::InvalidToken | AuthError::InvalidRefreshToken => {
                AppError::InvalidToken(e.to_string())
            }
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ClassroomError> for AppError {
    fn from(e: ClassroomError) -> Self {
        match e {
            ClassroomError::Unauthorized(msg) => AppError::Forbidden(msg),
            ClassroomError::NotFound(msg) => AppError::NotFound(msg),
            ClassroomError::InvalidOperation(msg) => AppError::InvalidOperation(msg),
            ClassroomError::Validation(msg) => AppError::Validation(msg),
            ClassroomError::DeliveryFailure(msg) => AppError::BadGateway(msg),
            ClassroomError::Store(e) => AppError::from(e),
        }
    }
}
