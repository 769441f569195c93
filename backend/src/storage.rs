use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use clinic_storage::{
    blob::{BlobStore, InMemoryBlobStore, S3BlobStore},
    document::{CollectionConfig, Document, MissingDocumentPolicy},
    news::NewsRepository,
    patient_image::PatientImageRepository,
};

use crate::types::{Environment, MissingDocumentMode, StorageBackend};

/// Builds the blob store selected by `STORAGE_BACKEND`
pub async fn blob_store(environment: &Environment) -> Arc<dyn BlobStore> {
    match environment.storage_backend() {
        StorageBackend::S3 => {
            let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
            let bucket_name = environment.s3_bucket();
            tracing::info!("Using S3 blob store in bucket {bucket_name}");

            Arc::new(S3BlobStore::new(
                s3_client,
                bucket_name,
                environment.blob_public_base_url(),
            ))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory blob store, data is lost on restart");
            Arc::new(InMemoryBlobStore::new())
        }
    }
}

/// Applies the environment's write settings and missing document mode to a collection
fn configure<T: Document>(
    environment: &Environment,
    config: CollectionConfig<T>,
    mode: MissingDocumentMode,
) -> CollectionConfig<T> {
    let config = config
        .with_retry(environment.write_retry_policy())
        .with_conditional_writes(environment.conditional_writes());

    match mode {
        MissingDocumentMode::Initialize
            if matches!(config.missing, MissingDocumentPolicy::ReturnEmpty) =>
        {
            config.with_missing_policy(MissingDocumentPolicy::Initialize(Vec::new()))
        }
        // Keeps the collection's own initial items
        MissingDocumentMode::Initialize => config,
        MissingDocumentMode::ReturnEmpty => {
            config.with_missing_policy(MissingDocumentPolicy::ReturnEmpty)
        }
    }
}

/// News repository configured for the environment
#[must_use]
pub fn news_repository(
    environment: &Environment,
    blob_store: Arc<dyn BlobStore>,
) -> Arc<NewsRepository> {
    let config = configure(
        environment,
        NewsRepository::default_config(),
        environment.news_missing_document(),
    );
    Arc::new(NewsRepository::new(blob_store, config))
}

/// Patient image repository configured for the environment
#[must_use]
pub fn patient_image_repository(
    environment: &Environment,
    blob_store: Arc<dyn BlobStore>,
) -> Arc<PatientImageRepository> {
    let config = configure(
        environment,
        PatientImageRepository::default_config(),
        environment.patients_missing_document(),
    );
    Arc::new(PatientImageRepository::new(blob_store, config))
}
