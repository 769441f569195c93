//! Collections persisted as a single JSON document
//!
//! Every operation reads the whole document from the blob store, and every mutation
//! rewrites it in full. Mutations are serialized per repository and carry the version
//! that was read as a write precondition, so a concurrent writer in another process is
//! reported as [`DocumentStorageError::Conflict`] instead of being overwritten.

mod error;
mod id;
mod retry;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::blob::{BlobError, BlobObject, BlobStore, WriteCondition};

pub use error::{DocumentStorageError, DocumentStorageResult};
pub use id::IdGenerator;
pub use retry::{RetryError, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

/// Content type of collection documents
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An item stored in a collection document
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Unique id within the collection
    fn id(&self) -> &str;

    /// Timestamp the collection is ordered by, newest first
    fn timestamp(&self) -> DateTime<Utc>;
}

/// What reading a collection does when its document does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingDocumentPolicy<T> {
    /// Persist these items as the initial document and return them
    Initialize(Vec<T>),
    /// Return an empty collection without writing anything
    ReturnEmpty,
}

/// Where new items are inserted into the stored array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// At the end
    Append,
    /// At the front
    Prepend,
}

/// Static description of a collection
#[derive(Debug, Clone)]
pub struct CollectionConfig<T> {
    /// Name used in log messages
    pub name: &'static str,
    /// Prefix listed to discover the document
    pub prefix: String,
    /// Full pathname of the document
    pub path: String,
    /// Behaviour when the document is absent
    pub missing: MissingDocumentPolicy<T>,
    /// Where `create` inserts new items
    pub insert_at: InsertPosition,
    /// Retry policy for document writes
    pub retry: RetryPolicy,
    /// Whether writes carry an `If-Match` / `If-None-Match` precondition
    pub conditional_writes: bool,
}

impl<T> CollectionConfig<T> {
    /// Replaces the missing document policy
    #[must_use]
    pub fn with_missing_policy(mut self, missing: MissingDocumentPolicy<T>) -> Self {
        self.missing = missing;
        self
    }

    /// Replaces the write retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enables or disables write preconditions
    #[must_use]
    pub const fn with_conditional_writes(mut self, enabled: bool) -> Self {
        self.conditional_writes = enabled;
        self
    }
}

/// Version of the document a snapshot was read from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Version {
    /// No document exists
    Absent,
    /// Document exists with this entity tag
    Tagged(String),
    /// Document exists but the store reported no entity tag
    Untagged,
}

impl Version {
    fn after_write(object: &BlobObject) -> Self {
        object
            .etag
            .clone()
            .map_or(Self::Untagged, Self::Tagged)
    }

    fn write_condition(&self) -> WriteCondition {
        match self {
            Self::Absent => WriteCondition::IfNoneMatch,
            Self::Tagged(etag) => WriteCondition::IfMatch(etag.clone()),
            Self::Untagged => WriteCondition::None,
        }
    }
}

/// Raw read result. `items` is `None` when there is no usable array.
struct Loaded<T> {
    items: Option<Vec<T>>,
    version: Version,
}

/// Collection content plus the version it was read from
struct Snapshot<T> {
    items: Vec<T>,
    version: Version,
}

/// Read-modify-write repository over one collection document
pub struct DocumentRepository<T: Document> {
    store: Arc<dyn BlobStore>,
    config: CollectionConfig<T>,
    ids: IdGenerator,
    write_lock: Mutex<()>,
}

impl<T: Document> DocumentRepository<T> {
    /// Creates a repository for the collection described by `config`
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, config: CollectionConfig<T>) -> Self {
        Self {
            store,
            config,
            ids: IdGenerator::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Blob store backing the collection
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Pathname of the collection document
    #[must_use]
    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// All items, newest first
    ///
    /// Read failures are logged and reported as an empty collection.
    pub async fn get_all(&self) -> Vec<T> {
        match self.try_get_all().await {
            Ok(items) => items,
            Err(err) => {
                warn!(
                    "Failed to read {} collection, returning empty result: {err}",
                    self.config.name
                );
                Vec::new()
            }
        }
    }

    /// At most `limit` newest items. `None` or zero means no limit.
    pub async fn get_latest(&self, limit: Option<usize>) -> Vec<T> {
        let mut items = self.get_all().await;
        if let Some(limit) = limit.filter(|limit| *limit > 0) {
            items.truncate(limit);
        }
        items
    }

    /// Item with the given id
    pub async fn get_by_id(&self, id: &str) -> Option<T> {
        self.get_all().await.into_iter().find(|item| item.id() == id)
    }

    /// All items, newest first, with read failures reported
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError` if the document cannot be read, parsed, or initialized
    pub async fn try_get_all(&self) -> DocumentStorageResult<Vec<T>> {
        let mut items = self.snapshot().await?.items;
        items.sort_by_key(|item| std::cmp::Reverse(item.timestamp()));
        Ok(items)
    }

    /// Adds an item built from a freshly minted id
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError` if reading or persisting the collection fails
    pub async fn create<F>(&self, build: F) -> DocumentStorageResult<T>
    where
        F: FnOnce(String) -> T + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.snapshot().await?;

        let id = self
            .ids
            .next_id(snapshot.items.iter().map(|item| item.id()));
        let item = build(id);

        match self.config.insert_at {
            InsertPosition::Append => snapshot.items.push(item.clone()),
            InsertPosition::Prepend => snapshot.items.insert(0, item.clone()),
        }

        self.save(&snapshot.items, &snapshot.version).await?;
        info!("Created {} item {}", self.config.name, item.id());

        Ok(item)
    }

    /// Applies `apply` to the item with the given id
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError::NotFound` if no item has the id, or another
    /// `DocumentStorageError` if reading or persisting the collection fails
    pub async fn update<F>(&self, id: &str, apply: F) -> DocumentStorageResult<T>
    where
        F: FnOnce(&mut T) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.snapshot().await?;

        let item = snapshot
            .items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| DocumentStorageError::NotFound(id.to_string()))?;
        apply(item);
        let updated = item.clone();

        self.save(&snapshot.items, &snapshot.version).await?;
        info!("Updated {} item {id}", self.config.name);

        Ok(updated)
    }

    /// Removes the item with the given id and returns it
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError::NotFound` if no item has the id, or another
    /// `DocumentStorageError` if reading or persisting the collection fails
    pub async fn delete(&self, id: &str) -> DocumentStorageResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.snapshot().await?;

        let position = snapshot
            .items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| DocumentStorageError::NotFound(id.to_string()))?;
        let removed = snapshot.items.remove(position);

        self.save(&snapshot.items, &snapshot.version).await?;
        info!("Deleted {} item {id}", self.config.name);

        Ok(removed)
    }

    async fn load(&self) -> DocumentStorageResult<Loaded<T>> {
        let objects = self
            .store
            .list(&self.config.prefix)
            .await
            .map_err(DocumentStorageError::Read)?;

        let Some(object) = objects
            .into_iter()
            .find(|object| object.pathname == self.config.path)
        else {
            debug!("{} document {} not found", self.config.name, self.config.path);
            return Ok(Loaded {
                items: None,
                version: Version::Absent,
            });
        };

        let stored = match self.store.get(&self.config.path).await {
            Ok(stored) => stored,
            // Deleted between list and get
            Err(BlobError::NotFound(_)) => {
                return Ok(Loaded {
                    items: None,
                    version: Version::Absent,
                })
            }
            Err(err) => return Err(DocumentStorageError::Read(err)),
        };

        let version = stored
            .etag
            .or(object.etag)
            .map_or(Version::Untagged, Version::Tagged);

        let value: serde_json::Value = serde_json::from_slice(&stored.body)?;
        if !value.is_array() {
            warn!(
                "{} document {} is not a JSON array, treating it as missing",
                self.config.name, self.config.path
            );
            return Ok(Loaded {
                items: None,
                version,
            });
        }

        Ok(Loaded {
            items: Some(serde_json::from_value(value)?),
            version,
        })
    }

    async fn load_or_initialize(&self) -> DocumentStorageResult<Snapshot<T>> {
        let loaded = self.load().await?;

        if let Some(items) = loaded.items {
            return Ok(Snapshot {
                items,
                version: loaded.version,
            });
        }

        match &self.config.missing {
            MissingDocumentPolicy::ReturnEmpty => Ok(Snapshot {
                items: Vec::new(),
                version: loaded.version,
            }),
            MissingDocumentPolicy::Initialize(initial) => {
                let object = self.save(initial, &loaded.version).await?;
                info!(
                    "Initialized {} document {} with {} items",
                    self.config.name,
                    self.config.path,
                    initial.len()
                );
                Ok(Snapshot {
                    items: initial.clone(),
                    version: Version::after_write(&object),
                })
            }
        }
    }

    /// Current collection, reloaded once if another writer initialized it first
    async fn snapshot(&self) -> DocumentStorageResult<Snapshot<T>> {
        match self.load_or_initialize().await {
            Err(DocumentStorageError::Conflict(_)) => self.load_or_initialize().await,
            other => other,
        }
    }

    async fn save(&self, items: &[T], version: &Version) -> DocumentStorageResult<BlobObject> {
        let body = serde_json::to_vec_pretty(items)?;
        let condition = if self.config.conditional_writes {
            version.write_condition()
        } else {
            WriteCondition::None
        };

        let store = &self.store;
        let path = self.config.path.as_str();
        let what = format!("Saving {} document", self.config.name);

        self.config
            .retry
            .run(&what, move || {
                store.put(path, body.clone(), JSON_CONTENT_TYPE, condition.clone())
            })
            .await
            .map_err(|RetryError { attempts, source }| match source {
                BlobError::PreconditionFailed(pathname) => {
                    warn!("{} document {pathname} changed concurrently", self.config.name);
                    DocumentStorageError::Conflict(pathname)
                }
                source => {
                    error!(
                        "All {attempts} attempts to save {} document failed: {source}",
                        self.config.name
                    );
                    DocumentStorageError::Write { attempts, source }
                }
            })
    }
}
