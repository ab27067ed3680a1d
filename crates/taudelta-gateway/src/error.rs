//! API error types and response formatting.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::ingest::IngestError;
use crate::store::StoreError;

/// API error type that converts to appropriate HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The insert body was malformed or failed validation.
    #[error("invalid request data")]
    InvalidRequest,

    /// A discovery query failed. The store message is passed through.
    #[error("discovery failed: {0}")]
    Discovery(StoreError),

    /// The store did not accept a point.
    #[error("insert failed: {0}")]
    Insert(StoreError),
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Invalid(_) => Self::InvalidRequest,
            IngestError::Store(e) => Self::Insert(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Self::InvalidRequest => (StatusCode::BAD_REQUEST, "Invalid request data".to_string()),
            Self::Discovery(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::Insert(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to insert data".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
