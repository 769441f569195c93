pub mod news;
pub mod patients;
pub mod upload;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::extract::{multipart::MultipartError, Multipart};
use clinic_storage::patient_image::ImageUpload;
use schemars::JsonSchema;
use serde::Serialize;

use crate::types::AppError;

/// Name of the multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// Creates the `/api` router
///
/// Read routes are public. Mutating handlers take an `AdminAccess` argument.
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/news", get(news::list_news).post(news::create_news))
        .api_route(
            "/news/{id}",
            get(news::get_news)
                .put(news::update_news)
                .delete(news::delete_news),
        )
        .api_route(
            "/patients",
            get(patients::list_patient_images).post(patients::upload_patient_image),
        )
        .api_route(
            "/patients/{id}",
            get(patients::get_patient_image).delete(patients::delete_patient_image),
        )
        .api_route("/upload", post(upload::upload_file))
}

/// Response of delete endpoints
#[derive(Debug, Serialize, JsonSchema)]
pub struct SuccessResponse {
    /// Always `true`
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

fn multipart_error(err: &MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

/// Reads the `file` field of a multipart body, skipping any other field
pub async fn read_file_field(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(&err))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(ToString::to_string);
        let content_type = field.content_type().map(ToString::to_string);
        let data = field.bytes().await.map_err(|err| multipart_error(&err))?;

        if data.is_empty() {
            return Err(AppError::bad_request("No file provided"));
        }

        return Ok(ImageUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(AppError::bad_request("No file provided"))
}
