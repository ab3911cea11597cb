use crate::keys::generate_blob_key;
use crate::traits::{BlobError, BlobResult, BlobStore, ByteStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use vidvault_core::{BlobRef, ByteRange};

/// S3-compatible blob destination.
#[derive(Clone)]
pub struct S3BlobStore {
    destination_id: String,
    store: AmazonS3,
    bucket: String,
    max_object_size: u64,
}

impl S3BlobStore {
    /// Create a new S3BlobStore.
    ///
    /// # Arguments
    /// * `destination_id` - Stable identifier used in manifests
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `max_object_size` - Per-object ceiling this destination enforces
    pub async fn new(
        destination_id: impl Into<String>,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        max_object_size: u64,
    ) -> BlobResult<Self> {
        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| BlobError::Permanent(e.to_string()))?;

        Ok(S3BlobStore {
            destination_id: destination_id.into(),
            store,
            bucket,
            max_object_size,
        })
    }

    fn map_error(key: &str, err: ObjectStoreError) -> BlobError {
        match err {
            ObjectStoreError::NotFound { .. } => BlobError::NotFound(key.to_string()),
            other => BlobError::Transient(other.to_string()),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn destination_id(&self) -> &str {
        &self.destination_id
    }

    fn max_object_size(&self) -> u64 {
        self.max_object_size
    }

    fn supports_ranges(&self) -> bool {
        true
    }

    async fn put(&self, data: Bytes) -> BlobResult<BlobRef> {
        let size = data.len() as u64;
        if size > self.max_object_size {
            return Err(BlobError::TooLarge {
                size,
                ceiling: self.max_object_size,
            });
        }

        let key = generate_blob_key();
        let location = Path::from(key.clone());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 blob upload failed"
            );
            Self::map_error(&key, e)
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 blob upload successful"
        );

        Ok(BlobRef { key, size })
    }

    async fn get(&self, blob: &BlobRef, range: Option<ByteRange>) -> BlobResult<ByteStream> {
        let location = Path::from(blob.key.clone());
        let start = std::time::Instant::now();

        if let Some(range) = range {
            let result: ObjectResult<Bytes> = self
                .store
                .get_range(&location, range.start..range.end)
                .await;
            let bytes = result.map_err(|e| Self::map_error(&blob.key, e))?;
            return Ok(Box::pin(futures::stream::once(async move { Ok(bytes) })));
        }

        let result: ObjectResult<_> = self.store.get(&location).await;
        let result = result.map_err(|e| Self::map_error(&blob.key, e))?;

        let bucket = self.bucket.clone();
        let key = blob.key.clone();

        let stream = result.into_stream().map(move |res| {
            res.map_err(|e| {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 blob stream error"
                );
                BlobError::Transient(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn exists(&self, blob: &BlobRef) -> BlobResult<bool> {
        let location = Path::from(blob.key.clone());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(BlobError::Transient(e.to_string())),
        }
    }

    async fn delete(&self, blob: &BlobRef) -> BlobResult<()> {
        let location = Path::from(blob.key.clone());
        let start = std::time::Instant::now();

        match self.store.delete(&location).await {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %blob.key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 blob delete failed"
                );
                return Err(Self::map_error(&blob.key, e));
            }
        }

        Ok(())
    }
}
