//! Custom extractors for request validation

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

use crate::types::error::AppError;

/// Fallback message when a validation error carries none
const DEFAULT_VALIDATION_MESSAGE: &str = "Invalid request body";

/// Custom JSON extractor that validates the payload
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: serde::de::DeserializeOwned + Validate + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // First extract JSON
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => {
                    AppError::bad_request("Missing Content-Type: application/json header")
                }
                _ => AppError::bad_request("Invalid JSON payload"),
            })?;

        // Then validate, reporting the first field message
        payload.validate().map_err(|errors| {
            let message = errors
                .field_errors()
                .values()
                .find_map(|field_errors| field_errors.first()?.message.clone())
                .map_or_else(|| DEFAULT_VALIDATION_MESSAGE.to_string(), |m| m.to_string());
            AppError::bad_request(message)
        })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for ValidatedJson<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        // Delegate to Json<T>'s implementation since ValidatedJson has the same structure
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        // Document validation error responses
        AppError::inferred_responses(ctx, operation)
    }
}

/// Query parameters of list endpoints
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListQuery {
    /// Maximum number of items to return. Missing, invalid or zero means all items.
    pub limit: Option<String>,
}

impl ListQuery {
    /// Parsed limit, `None` when absent or unusable
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|limit| limit.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
    }
}
