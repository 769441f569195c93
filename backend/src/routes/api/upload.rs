use std::sync::Arc;

use axum::{extract::Multipart, Extension, Json};
use clinic_storage::patient_image::{PatientImageRepository, DEFAULT_CONTENT_TYPE};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use super::read_file_field;
use crate::{middleware::AdminAccess, types::AppError};

/// A stored file
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Public URL of the file
    pub url: String,
    /// Key of the file inside the blob store
    pub pathname: String,
    /// Content type the file was stored with
    pub content_type: String,
}

/// Upload a file without adding it to the gallery
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - No file in the request
/// - `401 UNAUTHORIZED` - Invalid or missing admin token
/// - `500 INTERNAL_SERVER_ERROR` - The file could not be stored
#[instrument(skip_all)]
pub async fn upload_file(
    _admin: AdminAccess,
    Extension(patients): Extension<Arc<PatientImageRepository>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = read_file_field(multipart).await?;
    let content_type = upload
        .content_type
        .clone()
        .filter(|content_type| !content_type.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let object = patients.store_file(upload).await?;

    Ok(Json(UploadResponse {
        url: object.url,
        pathname: object.pathname,
        content_type,
    }))
}
