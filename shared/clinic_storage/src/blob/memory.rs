//! Process-local blob store, used for development and tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{strip_base_url, BlobError, BlobObject, BlobResult, BlobStore, StoredBlob, WriteCondition};

/// Base URL of objects held by [`InMemoryBlobStore`]
pub const IN_MEMORY_BASE_URL: &str = "memory://blobs";

#[derive(Debug, Clone)]
struct Entry {
    body: Vec<u8>,
    object: BlobObject,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, Entry>,
    version: u64,
    #[cfg(feature = "test-utils")]
    failing_puts: u32,
    #[cfg(feature = "test-utils")]
    failing_puts_prefix: Option<String>,
    #[cfg(feature = "test-utils")]
    failing_deletes: u32,
    #[cfg(feature = "test-utils")]
    put_attempts: u32,
}

/// Blob store keeping every object in memory
///
/// Entity tags are derived from a store-wide version counter, so every write produces a
/// new tag and conditional writes behave like they do against S3.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    state: Mutex<State>,
}

impl InMemoryBlobStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> BlobResult<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| BlobError::ConfigError("in-memory blob store lock poisoned".to_string()))
    }
}

#[cfg(feature = "test-utils")]
impl InMemoryBlobStore {
    /// Makes the next `count` puts fail with a transient error
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    pub fn fail_next_puts(&self, count: u32) {
        let mut state = self.state.lock().unwrap();
        state.failing_puts = count;
        state.failing_puts_prefix = None;
    }

    /// Makes the next `count` puts under `prefix` fail with a transient error
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    pub fn fail_next_puts_under(&self, prefix: &str, count: u32) {
        let mut state = self.state.lock().unwrap();
        state.failing_puts = count;
        state.failing_puts_prefix = Some(prefix.to_string());
    }

    /// Makes the next `count` deletes fail with a transient error
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    pub fn fail_next_deletes(&self, count: u32) {
        self.state.lock().unwrap().failing_deletes = count;
    }

    /// Number of put calls seen so far, failed ones included
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    #[must_use]
    pub fn put_attempts(&self) -> u32 {
        self.state.lock().unwrap().put_attempts
    }

    /// Raw content of an object
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned
    #[must_use]
    pub fn raw(&self, pathname: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(pathname)
            .map(|entry| entry.body.clone())
    }

    /// Whether an object exists under `pathname`
    #[must_use]
    pub fn contains(&self, pathname: &str) -> bool {
        self.raw(pathname).is_some()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobObject>> {
        let state = self.lock()?;
        Ok(state
            .objects
            .range(prefix.to_string()..)
            .take_while(|(pathname, _)| pathname.starts_with(prefix))
            .map(|(_, entry)| entry.object.clone())
            .collect())
    }

    async fn get(&self, pathname: &str) -> BlobResult<StoredBlob> {
        let state = self.lock()?;
        state
            .objects
            .get(pathname)
            .map(|entry| StoredBlob {
                body: entry.body.clone(),
                etag: entry.object.etag.clone(),
            })
            .ok_or_else(|| BlobError::NotFound(pathname.to_string()))
    }

    async fn put(
        &self,
        pathname: &str,
        body: Vec<u8>,
        _content_type: &str,
        condition: WriteCondition,
    ) -> BlobResult<BlobObject> {
        let mut state = self.lock()?;

        #[cfg(feature = "test-utils")]
        {
            state.put_attempts += 1;
            let targeted = state
                .failing_puts_prefix
                .as_deref()
                .is_none_or(|prefix| pathname.starts_with(prefix));
            if targeted && state.failing_puts > 0 {
                state.failing_puts -= 1;
                return Err(BlobError::UpstreamError(format!(
                    "injected put failure for {pathname}"
                )));
            }
        }

        let current_etag = state
            .objects
            .get(pathname)
            .map(|entry| entry.object.etag.clone());

        let allowed = match (&condition, &current_etag) {
            (WriteCondition::None, _) => true,
            (WriteCondition::IfNoneMatch, existing) => existing.is_none(),
            (WriteCondition::IfMatch(expected), Some(Some(actual))) => expected == actual,
            (WriteCondition::IfMatch(_), _) => false,
        };
        if !allowed {
            return Err(BlobError::PreconditionFailed(pathname.to_string()));
        }

        state.version += 1;
        let object = BlobObject {
            pathname: pathname.to_string(),
            url: self.public_url(pathname),
            size: body.len() as u64,
            uploaded_at: Utc::now(),
            etag: Some(format!("\"v{}\"", state.version)),
        };
        state.objects.insert(
            pathname.to_string(),
            Entry {
                body,
                object: object.clone(),
            },
        );

        Ok(object)
    }

    async fn delete(&self, pathname: &str) -> BlobResult<()> {
        let mut state = self.lock()?;

        #[cfg(feature = "test-utils")]
        if state.failing_deletes > 0 {
            state.failing_deletes -= 1;
            return Err(BlobError::UpstreamError(format!(
                "injected delete failure for {pathname}"
            )));
        }

        state.objects.remove(pathname);
        Ok(())
    }

    fn public_url(&self, pathname: &str) -> String {
        format!("{IN_MEMORY_BASE_URL}/{pathname}")
    }

    fn pathname_from_url(&self, url: &str) -> Option<String> {
        strip_base_url(IN_MEMORY_BASE_URL, url)
    }
}
