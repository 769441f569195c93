use std::sync::Arc;

use aide::axum::IntoApiResponse;
use axum::{Extension, Json};
use clinic_storage::blob::BlobStore;
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    status: String,
    /// Current version of the application
    semver: String,
    /// Commit hash of the current build (if available)
    rev: Option<String>,
    /// Blob store reachability: `ok` or `unavailable`
    storage: String,
}

/// Health check endpoint
///
/// Returns the current status and version information of the service.
/// Storage problems are reported in the body and do not fail the check.
pub async fn handler(Extension(blob_store): Extension<Arc<dyn BlobStore>>) -> impl IntoApiResponse {
    let storage = match blob_store.check_access().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!("Blob store health check failed: {err}");
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        semver: env!("CARGO_PKG_VERSION").to_string(),
        rev: option_env!("GIT_REV").map(ToString::to_string),
        storage: storage.to_string(),
    })
}
