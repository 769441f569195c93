//! Photos of patients shown in the public gallery
//!
//! The binary is uploaded under `patients/` first; the collection document only keeps its
//! public URL. Removing an image deletes the metadata entry and then, best effort, the
//! binary itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::blob::{BlobObject, BlobStore, WriteCondition};
use crate::document::{
    CollectionConfig, Document, DocumentRepository, DocumentStorageError, DocumentStorageResult,
    IdGenerator, InsertPosition, MissingDocumentPolicy, RetryPolicy,
};
use crate::news::DATA_PREFIX;

/// Pathname of the patient image metadata document
pub const PATIENTS_DOCUMENT_PATH: &str = "data/patients-metadata.json";

/// Prefix of uploaded patient photos
pub const PATIENT_IMAGES_PREFIX: &str = "patients/";

/// Content type used when the upload does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata of an uploaded patient photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientImage {
    /// String-encoded creation timestamp in milliseconds
    pub id: String,
    /// Public URL of the binary
    pub url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Document for PatientImage {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// An uploaded file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-side file name, only its extension is kept
    pub file_name: Option<String>,
    /// Declared content type
    pub content_type: Option<String>,
    /// File content
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Lowercased extension of the client-side file name
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (stem, extension) = name.rsplit_once('.')?;
        let valid = !stem.is_empty()
            && !extension.is_empty()
            && extension.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| extension.to_ascii_lowercase())
    }

    fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|content_type| !content_type.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Pathname for an uploaded photo: `patients/patient-<stamp>[.<ext>]`
#[must_use]
pub fn image_pathname(stamp: &str, extension: Option<&str>) -> String {
    extension.map_or_else(
        || format!("{PATIENT_IMAGES_PREFIX}patient-{stamp}"),
        |extension| format!("{PATIENT_IMAGES_PREFIX}patient-{stamp}.{extension}"),
    )
}

/// Storage for patient photos and their metadata
pub struct PatientImageRepository {
    documents: DocumentRepository<PatientImage>,
    file_stamps: IdGenerator,
}

impl PatientImageRepository {
    /// Default collection settings: prepended items, empty when the document is missing
    #[must_use]
    pub fn default_config() -> CollectionConfig<PatientImage> {
        CollectionConfig {
            name: "patient image",
            prefix: DATA_PREFIX.to_string(),
            path: PATIENTS_DOCUMENT_PATH.to_string(),
            missing: MissingDocumentPolicy::ReturnEmpty,
            insert_at: InsertPosition::Prepend,
            retry: RetryPolicy::default(),
            conditional_writes: true,
        }
    }

    /// Creates a repository with custom collection settings
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, config: CollectionConfig<PatientImage>) -> Self {
        Self {
            documents: DocumentRepository::new(store, config),
            file_stamps: IdGenerator::new(),
        }
    }

    /// All images, newest first. Read failures yield an empty list.
    pub async fn get_all(&self) -> Vec<PatientImage> {
        self.documents.get_all().await
    }

    /// The `limit` newest images
    pub async fn get_latest(&self, limit: Option<usize>) -> Vec<PatientImage> {
        self.documents.get_latest(limit).await
    }

    /// Image with the given id
    pub async fn get_by_id(&self, id: &str) -> Option<PatientImage> {
        self.documents.get_by_id(id).await
    }

    /// Stores a file under `patients/` without recording it in the collection
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError::Upload` if the blob store rejects the file
    pub async fn store_file(&self, upload: ImageUpload) -> DocumentStorageResult<BlobObject> {
        let content_type = upload.content_type().to_string();
        // Unique per process even for uploads within the same millisecond
        let stamp = self.file_stamps.next_id(std::iter::empty());
        let pathname = image_pathname(&stamp, upload.extension().as_deref());

        let object = self
            .documents
            .store()
            .put(&pathname, upload.data, &content_type, WriteCondition::None)
            .await
            .map_err(DocumentStorageError::Upload)?;

        info!("Stored file {} ({} bytes)", object.pathname, object.size);
        Ok(object)
    }

    /// Uploads a photo and records it at the front of the collection
    ///
    /// The binary is removed again if the metadata cannot be saved.
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError` if the upload or the metadata write fails
    pub async fn upload(&self, upload: ImageUpload) -> DocumentStorageResult<PatientImage> {
        let object = self.store_file(upload).await?;

        match self.add(object.url.clone()).await {
            Ok(image) => Ok(image),
            Err(err) => {
                if let Err(cleanup_err) = self.documents.store().delete(&object.pathname).await {
                    warn!(
                        "Failed to remove orphaned file {} after metadata error: {cleanup_err}",
                        object.pathname
                    );
                }
                Err(err)
            }
        }
    }

    /// Records an already uploaded image
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError` if the collection cannot be read or persisted
    pub async fn add(&self, url: String) -> DocumentStorageResult<PatientImage> {
        self.documents
            .create(|id| PatientImage {
                id,
                url,
                created_at: Utc::now(),
            })
            .await
    }

    /// Removes an image from the collection, then deletes its binary
    ///
    /// A failed binary delete is logged and does not fail the operation.
    ///
    /// # Errors
    ///
    /// Returns `DocumentStorageError::NotFound` if the image does not exist
    pub async fn delete(&self, id: &str) -> DocumentStorageResult<PatientImage> {
        let removed = self.documents.delete(id).await?;
        let store = self.documents.store();

        match store.pathname_from_url(&removed.url) {
            Some(pathname) => match store.delete(&pathname).await {
                Ok(()) => info!("Deleted file {pathname} of patient image {id}"),
                Err(err) => warn!("Failed to delete file {pathname} of patient image {id}: {err}"),
            },
            None => info!(
                "Patient image {id} points outside the blob store, keeping {}",
                removed.url
            ),
        }

        Ok(removed)
    }
}
