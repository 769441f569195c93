//! Object storage abstraction
//!
//! Objects are addressed by a pathname (`data/news.json`, `patients/patient-1.jpg`) and are
//! publicly reachable under a URL derived from that pathname once written.

mod error;
mod memory;
mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use error::{BlobError, BlobResult};
pub use memory::{InMemoryBlobStore, IN_MEMORY_BASE_URL};
pub use s3::S3BlobStore;

/// Prefix listed by [`BlobStore::check_access`]
pub const ACCESS_CHECK_PREFIX: &str = "access-check/";

/// Metadata of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    /// Key of the object inside the store
    pub pathname: String,
    /// Public URL of the object
    pub url: String,
    /// Size in bytes
    pub size: u64,
    /// Last write time
    pub uploaded_at: DateTime<Utc>,
    /// Entity tag identifying the current version, when the store reports one
    pub etag: Option<String>,
}

/// Object content together with its version
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Raw object bytes
    pub body: Vec<u8>,
    /// Entity tag of the version that was read
    pub etag: Option<String>,
}

/// Precondition attached to a write
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteCondition {
    /// Unconditional overwrite
    #[default]
    None,
    /// Only write if the current version still has this entity tag
    IfMatch(String),
    /// Only write if no object exists under the pathname
    IfNoneMatch,
}

/// Key-value object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Lists every object whose pathname starts with `prefix`
    ///
    /// # Errors
    ///
    /// Returns `BlobError` if the listing request fails
    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobObject>>;

    /// Reads an object, bypassing any intermediate cache
    ///
    /// # Errors
    ///
    /// Returns `BlobError::NotFound` if no object exists under `pathname`
    async fn get(&self, pathname: &str) -> BlobResult<StoredBlob>;

    /// Writes an object, overwriting any existing one when `condition` allows it
    ///
    /// # Errors
    ///
    /// Returns `BlobError::PreconditionFailed` if `condition` does not hold
    async fn put(
        &self,
        pathname: &str,
        body: Vec<u8>,
        content_type: &str,
        condition: WriteCondition,
    ) -> BlobResult<BlobObject>;

    /// Deletes an object. Deleting a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns `BlobError` if the delete request fails
    async fn delete(&self, pathname: &str) -> BlobResult<()>;

    /// Public URL under which `pathname` is served
    fn public_url(&self, pathname: &str) -> String;

    /// Reverse of [`BlobStore::public_url`]. `None` for URLs this store does not serve.
    fn pathname_from_url(&self, url: &str) -> Option<String>;

    /// Verifies that the store is reachable with the configured credentials
    ///
    /// # Errors
    ///
    /// Returns the `BlobError` of the failed probe
    async fn check_access(&self) -> BlobResult<()> {
        self.list(ACCESS_CHECK_PREFIX).await.map(|_| ())
    }
}

/// Splits `url` on `base_url` and returns the remaining pathname
pub(crate) fn strip_base_url(base_url: &str, url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let pathname = rest.split(['?', '#']).next().unwrap_or_default();

    if pathname.is_empty() {
        None
    } else {
        Some(pathname.to_string())
    }
}
