//! Error handling module
//!
//! Centralized intake error types and HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::jobs::QueueError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    // Server errors (5xx)
    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Closed => AppError::ShuttingDown,
        }
    }
}

impl From<crate::domain::AmountError> for AppError {
    fn from(err: crate::domain::AmountError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.to_string()))
            }
            AppError::TransactionNotFound(id) => {
                (StatusCode::NOT_FOUND, "transaction_not_found", Some(id.to_string()))
            }

            // 503 Service Unavailable
            AppError::ShuttingDown => {
                (StatusCode::SERVICE_UNAVAILABLE, "shutting_down", None)
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Storage error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
