//! Error types for blob store operations

use aws_sdk_s3::{
    error::{ProvideErrorMetadata, SdkError},
    operation::{
        delete_object::DeleteObjectError, get_object::GetObjectError,
        list_objects_v2::ListObjectsV2Error, put_object::PutObjectError,
    },
};
use thiserror::Error;

/// Result type for blob store operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob store operations
#[derive(Error, Debug)]
pub enum BlobError {
    /// S3 service error
    #[error("S3 service error: {0}")]
    S3Error(String),

    /// AWS SDK error (dispatch, timeout, response parsing)
    #[error("AWS SDK error: {0}")]
    AwsError(String),

    /// Upstream service error (5xx from the object store)
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Conditional write rejected because the object changed
    #[error("Precondition failed for object: {0}")]
    PreconditionFailed(String),
}

impl BlobError {
    /// Whether repeating the same request may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::S3Error(_) | Self::AwsError(_) | Self::UpstreamError(_)
        )
    }
}

/// Maps the parts every S3 operation error shares: 5xx responses and non-service failures
fn map_sdk_error<E>(error: SdkError<E>) -> BlobError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    match error {
        SdkError::ServiceError(service_err) if service_err.raw().status().as_u16() >= 500 => {
            BlobError::UpstreamError(format!("{:?}", service_err.err()))
        }
        SdkError::ServiceError(service_err) => BlobError::S3Error(format!(
            "{}: {}",
            service_err.err().code().unwrap_or("Unknown"),
            service_err.err().message().unwrap_or_default()
        )),
        other => BlobError::AwsError(other.to_string()),
    }
}

impl From<SdkError<ListObjectsV2Error>> for BlobError {
    fn from(error: SdkError<ListObjectsV2Error>) -> Self {
        map_sdk_error(error)
    }
}

impl From<SdkError<GetObjectError>> for BlobError {
    fn from(error: SdkError<GetObjectError>) -> Self {
        match error {
            SdkError::ServiceError(ref service_err) if service_err.err().is_no_such_key() => {
                Self::NotFound(
                    service_err
                        .err()
                        .message()
                        .unwrap_or("NoSuchKey")
                        .to_string(),
                )
            }
            other => map_sdk_error(other),
        }
    }
}

impl From<SdkError<PutObjectError>> for BlobError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        match error {
            // 412 from If-Match / If-None-Match, 409 when a conditional write races another one
            SdkError::ServiceError(ref service_err)
                if matches!(service_err.raw().status().as_u16(), 409 | 412) =>
            {
                Self::PreconditionFailed(
                    service_err
                        .err()
                        .code()
                        .unwrap_or("PreconditionFailed")
                        .to_string(),
                )
            }
            other => map_sdk_error(other),
        }
    }
}

impl From<SdkError<DeleteObjectError>> for BlobError {
    fn from(error: SdkError<DeleteObjectError>) -> Self {
        map_sdk_error(error)
    }
}
