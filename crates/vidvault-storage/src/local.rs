use crate::keys::{generate_blob_key, validate_blob_key};
use crate::traits::{BlobError, BlobResult, BlobStore, ByteStream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use vidvault_core::{BlobRef, ByteRange};

/// Local filesystem blob destination.
///
/// Primarily used for development and as a backup destination; honors byte
/// ranges via seek + bounded read.
#[derive(Clone)]
pub struct LocalBlobStore {
    destination_id: String,
    base_path: PathBuf,
    max_object_size: u64,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore rooted at `base_path`.
    pub async fn new(
        destination_id: impl Into<String>,
        base_path: impl Into<PathBuf>,
        max_object_size: u64,
    ) -> BlobResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            BlobError::Permanent(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore {
            destination_id: destination_id.into(),
            base_path,
            max_object_size,
        })
    }

    /// Convert a blob key to a filesystem path, rejecting traversal attempts.
    fn key_to_path(&self, key: &str) -> BlobResult<PathBuf> {
        if !validate_blob_key(key) {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> BlobResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
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
        let path = self.key_to_path(&key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        tracing::info!(
            destination = %self.destination_id,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local blob upload successful"
        );

        Ok(BlobRef { key, size })
    }

    async fn get(&self, blob: &BlobRef, range: Option<ByteRange>) -> BlobResult<ByteStream> {
        let path = self.key_to_path(&blob.key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BlobError::NotFound(blob.key.clone()));
        }

        let mut file = fs::File::open(&path).await?;

        let reader: Box<dyn tokio::io::AsyncRead + Send + Unpin> = match range {
            Some(range) => {
                file.seek(SeekFrom::Start(range.start)).await?;
                Box::new(tokio::io::AsyncReadExt::take(file, range.len()))
            }
            None => Box::new(file),
        };

        let key = blob.key.clone();
        let stream = tokio_util::io::ReaderStream::new(reader).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local blob read error");
                BlobError::Io(e)
            })
        });

        Ok(Box::pin(stream))
    }

    async fn exists(&self, blob: &BlobRef) -> BlobResult<bool> {
        let path = self.key_to_path(&blob.key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn delete(&self, blob: &BlobRef) -> BlobResult<()> {
        let path = self.key_to_path(&blob.key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await?;

        tracing::info!(
            destination = %self.destination_id,
            key = %blob.key,
            "Local blob delete successful"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::collect_stream;
    use tempfile::tempdir;

    async fn store(dir: &tempfile::TempDir) -> LocalBlobStore {
        LocalBlobStore::new("local-test", dir.path(), 1024)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let data = Bytes::from_static(b"local blob bytes");
        let blob = store.put(data.clone()).await.unwrap();
        assert_eq!(blob.size, data.len() as u64);

        let stream = store.get(&blob, None).await.unwrap();
        assert_eq!(collect_stream(stream).await.unwrap(), data);
    }

    #[tokio::test]
    async fn ranged_get_returns_slice() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let data = Bytes::from_static(b"0123456789");
        let blob = store.put(data).await.unwrap();

        let range = ByteRange::new(2, 7).unwrap();
        let stream = store.get(&blob, Some(range)).await.unwrap();
        assert_eq!(&collect_stream(stream).await.unwrap()[..], b"23456");
    }

    #[tokio::test]
    async fn oversized_put_rejected() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let data = Bytes::from(vec![0u8; 2048]);
        let result = store.put(data).await;
        assert!(matches!(result, Err(BlobError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn traversal_key_rejected() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let blob = BlobRef {
            key: "../../etc/passwd".to_string(),
            size: 1,
        };
        assert!(matches!(
            store.get(&blob, None).await,
            Err(BlobError::InvalidKey(_))
        ));
        assert!(matches!(
            store.delete(&blob).await,
            Err(BlobError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn exists_and_delete() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let blob = store.put(Bytes::from_static(b"x")).await.unwrap();
        assert!(store.exists(&blob).await.unwrap());

        store.delete(&blob).await.unwrap();
        assert!(!store.exists(&blob).await.unwrap());

        // Deleting a missing blob is not an error.
        store.delete(&blob).await.unwrap();
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store(&dir).await;

        let blob = BlobRef {
            key: "blobs/missing".to_string(),
            size: 1,
        };
        assert!(matches!(
            store.get(&blob, None).await,
            Err(BlobError::NotFound(_))
        ));
    }
}
