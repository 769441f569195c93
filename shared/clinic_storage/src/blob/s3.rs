//! S3-backed blob store

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{strip_base_url, BlobError, BlobObject, BlobResult, BlobStore, StoredBlob, WriteCondition};

/// Cache directives attached to every object so readers always see the latest write
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Blob store client for S3 operations
pub struct S3BlobStore {
    s3_client: Arc<S3Client>,
    bucket_name: String,
    public_base_url: String,
}

impl S3BlobStore {
    /// Creates a new S3 blob store
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket holding documents and uploaded binaries
    /// * `public_base_url` - URL prefix under which objects are publicly served
    #[must_use]
    pub fn new(s3_client: Arc<S3Client>, bucket_name: String, public_base_url: String) -> Self {
        Self {
            s3_client,
            bucket_name,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn to_chrono(timestamp: Option<&aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
        timestamp
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
            .unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobObject>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .s3_client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await?;

            objects.extend(response.contents().iter().filter_map(|object| {
                let key = object.key()?;
                Some(BlobObject {
                    pathname: key.to_string(),
                    url: self.public_url(key),
                    size: object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                    uploaded_at: Self::to_chrono(object.last_modified()),
                    etag: object.e_tag().map(ToString::to_string),
                })
            }));

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!("Listed {} objects under prefix {prefix}", objects.len());
        Ok(objects)
    }

    async fn get(&self, pathname: &str) -> BlobResult<StoredBlob> {
        let output = self
            .s3_client
            .get_object()
            .bucket(&self.bucket_name)
            .key(pathname)
            .response_cache_control(NO_CACHE)
            .send()
            .await?;

        let etag = output.e_tag().map(ToString::to_string);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| BlobError::AwsError(format!("Failed to read object body: {e}")))?
            .into_bytes()
            .to_vec();

        Ok(StoredBlob { body, etag })
    }

    async fn put(
        &self,
        pathname: &str,
        body: Vec<u8>,
        content_type: &str,
        condition: WriteCondition,
    ) -> BlobResult<BlobObject> {
        let size = body.len() as u64;

        let mut request = self
            .s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(pathname)
            .content_type(content_type)
            .cache_control(NO_CACHE)
            .body(ByteStream::from(body));

        request = match condition {
            WriteCondition::None => request,
            WriteCondition::IfMatch(etag) => request.if_match(etag),
            WriteCondition::IfNoneMatch => request.if_none_match("*"),
        };

        let output = request.send().await?;

        Ok(BlobObject {
            pathname: pathname.to_string(),
            url: self.public_url(pathname),
            size,
            uploaded_at: Utc::now(),
            etag: output.e_tag().map(ToString::to_string),
        })
    }

    async fn delete(&self, pathname: &str) -> BlobResult<()> {
        self.s3_client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(pathname)
            .send()
            .await?;

        Ok(())
    }

    fn public_url(&self, pathname: &str) -> String {
        format!("{}/{pathname}", self.public_base_url)
    }

    fn pathname_from_url(&self, url: &str) -> Option<String> {
        strip_base_url(&self.public_base_url, url)
    }
}
