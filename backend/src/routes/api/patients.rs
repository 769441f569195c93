use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query},
    http::StatusCode,
    Extension, Json,
};
use chrono::SecondsFormat;
use clinic_storage::patient_image::{PatientImage, PatientImageRepository};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use super::{read_file_field, SuccessResponse};
use crate::{
    middleware::AdminAccess,
    types::{AppError, ListQuery},
};

/// A photo in the patient gallery
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientImageResponse {
    /// String-encoded creation timestamp in milliseconds
    pub id: String,
    /// Public URL of the photo
    pub url: String,
    /// Upload time (ISO-8601, UTC)
    pub created_at: String,
}

impl From<PatientImage> for PatientImageResponse {
    fn from(image: PatientImage) -> Self {
        Self {
            id: image.id,
            url: image.url,
            created_at: image.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// List patient photos
///
/// Returns photos newest first, truncated to `limit` when given.
#[instrument(skip_all)]
pub async fn list_patient_images(
    Extension(patients): Extension<Arc<PatientImageRepository>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<PatientImageResponse>> {
    let images = patients.get_latest(query.limit()).await;
    Json(images.into_iter().map(PatientImageResponse::from).collect())
}

/// Get a patient photo by ID
///
/// # Errors
///
/// Returns `404 NOT_FOUND` if no photo has the ID
#[instrument(skip_all, fields(id = %id))]
pub async fn get_patient_image(
    Extension(patients): Extension<Arc<PatientImageRepository>>,
    Path(id): Path<String>,
) -> Result<Json<PatientImageResponse>, AppError> {
    patients
        .get_by_id(&id)
        .await
        .map(|image| Json(image.into()))
        .ok_or_else(|| AppError::not_found("Patient image not found"))
}

/// Upload a patient photo
///
/// Expects a multipart body with the photo in the `file` field.
///
/// # Returns
///
/// Returns `201 CREATED` with the recorded photo
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - No file in the request
/// - `401 UNAUTHORIZED` - Invalid or missing admin token
/// - `409 CONFLICT` - The collection was modified concurrently
/// - `500 INTERNAL_SERVER_ERROR` - The photo or its metadata could not be stored
#[instrument(skip_all)]
pub async fn upload_patient_image(
    _admin: AdminAccess,
    Extension(patients): Extension<Arc<PatientImageRepository>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PatientImageResponse>), AppError> {
    let upload = read_file_field(multipart).await?;
    let image = patients.upload(upload).await?;

    Ok((StatusCode::CREATED, Json(image.into())))
}

/// Delete a patient photo
///
/// Removes the metadata entry and then the stored file. A failure to
/// delete the file is logged and does not fail the request.
///
/// # Errors
///
/// Returns an error if:
/// - `401 UNAUTHORIZED` - Invalid or missing admin token
/// - `404 NOT_FOUND` - No photo has the ID
/// - `409 CONFLICT` - The collection was modified concurrently
/// - `500 INTERNAL_SERVER_ERROR` - The collection could not be persisted
#[instrument(skip_all, fields(id = %id))]
pub async fn delete_patient_image(
    _admin: AdminAccess,
    Extension(patients): Extension<Arc<PatientImageRepository>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    patients.delete(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}
