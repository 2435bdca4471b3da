//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Every error body has the shape
//! `{"detail": "<message>"}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, ServiceError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Domain service rejected or failed the operation.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Service(ServiceError::Repository(_))
                | Self::Auth(
                    AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenDigest
                )
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service(err) => match err {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidRegistration
                | AuthError::InvalidUsername(_)
                | AuthError::UserAlreadyExists => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials | AuthError::InvalidToken => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::ProfileNotFound => StatusCode::NOT_FOUND,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenDigest => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    // Don't expose internal error details to clients
    fn detail(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_owned();
        }

        match self {
            Self::Service(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidRegistration | AuthError::InvalidUsername(_) => {
                    "Invalid username or password.".to_owned()
                }
                AuthError::UserAlreadyExists => "Username is already taken.".to_owned(),
                AuthError::InvalidCredentials => {
                    "No active account found with the given credentials".to_owned()
                }
                AuthError::InvalidToken => "Given token not valid for any token type".to_owned(),
                AuthError::ProfileNotFound => "Profile not found.".to_owned(),
                _ => "Authentication error".to_owned(),
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}
