//! Error types for collection document operations

use thiserror::Error;

use crate::blob::BlobError;

/// Result type alias for document repository operations
pub type DocumentStorageResult<T> = Result<T, DocumentStorageError>;

/// Errors raised while reading or rewriting a collection document
#[derive(Debug, Error)]
pub enum DocumentStorageError {
    /// No item with the given id exists in the collection
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Reading the collection document from the blob store failed
    #[error("Failed to read collection document: {0}")]
    Read(#[source] BlobError),

    /// Writing the collection document still failed after every attempt
    #[error("Failed to write collection document after {attempts} attempts: {source}")]
    Write {
        /// Number of attempts made
        attempts: u32,
        /// Error of the last attempt
        #[source]
        source: BlobError,
    },

    /// The document changed between read and write
    #[error("Collection document was modified concurrently: {0}")]
    Conflict(String),

    /// The document or an item in it could not be (de)serialized
    #[error("Failed to (de)serialize collection document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storing a binary object failed
    #[error("Failed to store object: {0}")]
    Upload(#[source] BlobError),
}
