//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_storage::{blob::BlobError, document::DocumentStorageError};
use schemars::JsonSchema;
use serde::Serialize;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                error: message.into(),
            },
        }
    }

    /// 400 with the given message
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 with the given message
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 with a generic message
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {} - {}", self.status, self.inner.error),
            500..=599 => tracing::error!("Server error: {} - {}", self.status, self.inner.error),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert collection storage errors to application errors
impl From<DocumentStorageError> for AppError {
    fn from(err: DocumentStorageError) -> Self {
        match &err {
            DocumentStorageError::NotFound(id) => {
                tracing::debug!("Item not found: {id}");
                Self::not_found("Not found")
            }
            DocumentStorageError::Conflict(pathname) => {
                tracing::warn!("Concurrent modification of {pathname}");
                Self::new(
                    StatusCode::CONFLICT,
                    "Data was modified concurrently, please retry",
                )
            }
            DocumentStorageError::Upload(BlobError::UpstreamError(msg)) => {
                tracing::error!("Blob store upstream error: {msg}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage service temporarily unavailable",
                )
            }
            DocumentStorageError::Upload(source) => {
                tracing::error!("Upload failed: {source}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
            }
            DocumentStorageError::Read(_)
            | DocumentStorageError::Write { .. }
            | DocumentStorageError::Serialization(_) => {
                tracing::error!("Storage error: {err}");
                Self::internal()
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
