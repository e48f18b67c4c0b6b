//! Error types for Mutuals
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//!
//! Mutating endpoints render failures as `{ "success": false, "error": ... }`
//! so clients can treat every action result uniformly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Login required")]
    Unauthorized,

    /// Viewer lacks ownership or mutual-follow access (403)
    #[error("{0}")]
    Forbidden(String),

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unique constraint or state conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// R2 storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing/hashing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code and metric label for this error
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
            AppError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encryption"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    /// Human-readable message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            AppError::Forbidden(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Database(_) => "Database error".to_string(),
            AppError::Storage(_) => "Storage error".to_string(),
            AppError::Internal(_) | AppError::Config(_) | AppError::Encryption(_) => {
                "Internal server error".to_string()
            }
            AppError::NotFound | AppError::Unauthorized => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        } else {
            tracing::debug!(error = %self, error_type, "Request rejected");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "success": false,
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_message_is_passed_through() {
        let error = AppError::Forbidden("You do not have permission to quote this post".into());
        assert_eq!(
            error.public_message(),
            "You do not have permission to quote this post"
        );
        assert_eq!(error.classify().0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn database_details_are_not_exposed() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(error.public_message(), "Database error");
        assert_eq!(error.classify().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
