use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;
use crate::util::NameError;

/// Error type returned by every handler.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request cannot be served as sent
    #[error("{0}")]
    BadRequest(String),

    /// Storage layer failure, classified by [`StorageError::is_client_error`]
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Failure not attributable to the request
    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Storage(e) if e.is_client_error() => {
                tracing::debug!(error = %e, "Rejected request");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal storage error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<NameError> for AppError {
    fn from(e: NameError) -> Self {
        AppError::Storage(StorageError::InvalidName(e))
    }
}
