//! Blob backend abstraction trait
//!
//! This module defines the [`BlobStore`] trait that every destination
//! (primary or backup) must implement, and the error taxonomy that separates
//! retryable faults from permanent ones.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use vidvault_core::{BlobRef, ByteRange};

/// Blob operation errors.
///
/// `Transient` covers faults worth retrying: timeouts, rate limits, network
/// blips. Everything else is permanent from the caller's point of view.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Object of {size} bytes exceeds destination ceiling of {ceiling} bytes")]
    TooLarge { size: u64, ceiling: u64 },

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Transient backend failure: {0}")]
    Transient(String),

    #[error("Backend rejected request: {0}")]
    Permanent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Whether a retry with backoff has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, BlobError::Transient(_) | BlobError::Io(_))
    }
}

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// A lazy sequence of byte chunks read from a destination.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BlobError>> + Send>>;

/// One logical blob destination.
///
/// A destination stores opaque byte objects up to its size ceiling and hands
/// back a [`BlobRef`] for each. The orchestration and resolution layers work
/// against this trait only, so backend-specific quirks (rate limits, range
/// support, endpoint details) stay inside the adapter.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stable identifier for this destination, used as the backups map key.
    fn destination_id(&self) -> &str;

    /// Maximum object size this destination accepts; the planner's ceiling.
    fn max_object_size(&self) -> u64;

    /// Whether `get` honors byte ranges. Destinations that do not must
    /// return the full object regardless of the requested range.
    fn supports_ranges(&self) -> bool;

    /// Store one object and return a reference to it.
    ///
    /// Fails with [`BlobError::TooLarge`] when `data` exceeds the ceiling.
    async fn put(&self, data: Bytes) -> BlobResult<BlobRef>;

    /// Fetch an object, optionally restricted to a byte range.
    ///
    /// The range is ignored by destinations where `supports_ranges` is false.
    async fn get(&self, blob: &BlobRef, range: Option<ByteRange>) -> BlobResult<ByteStream>;

    /// Cheap existence probe, no payload transfer.
    async fn exists(&self, blob: &BlobRef) -> BlobResult<bool>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, blob: &BlobRef) -> BlobResult<()>;
}

/// Collect a byte stream into a single buffer. Intended for objects bounded
/// by a destination ceiling, never for whole multi-chunk videos.
pub async fn collect_stream(mut stream: ByteStream) -> BlobResult<Bytes> {
    use bytes::BytesMut;
    use futures::StreamExt;

    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BlobError::Transient("timeout".into()).is_transient());
        assert!(BlobError::Io(std::io::Error::other("net")).is_transient());
        assert!(!BlobError::NotFound("k".into()).is_transient());
        assert!(!BlobError::Permanent("auth".into()).is_transient());
        assert!(!BlobError::TooLarge {
            size: 10,
            ceiling: 5
        }
        .is_transient());
    }

    #[tokio::test]
    async fn collect_stream_concatenates_chunks() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]));
        let collected = collect_stream(stream).await.unwrap();
        assert_eq!(&collected[..], b"hello world");
    }

    #[tokio::test]
    async fn collect_stream_propagates_errors() {
        let stream: ByteStream = Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(BlobError::Transient("connection reset".into())),
        ]));
        assert!(collect_stream(stream).await.is_err());
    }
}
