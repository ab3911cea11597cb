//! In-memory blob destination.
//!
//! Backs unit and integration tests for the orchestration and resolution
//! layers. Supports fault injection (transient failures for the next N
//! operations, or permanent failure of a whole operation class) and toggling
//! range support, so retry, failover, and range-degradation paths can be
//! exercised deterministically.

use crate::keys::generate_blob_key;
use crate::traits::{BlobError, BlobResult, BlobStore, ByteStream};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use vidvault_core::{BlobRef, ByteRange};

pub struct MemoryBlobStore {
    destination_id: String,
    max_object_size: u64,
    supports_ranges: bool,
    objects: Mutex<HashMap<String, Bytes>>,
    fail_next_puts: AtomicU32,
    fail_next_gets: AtomicU32,
    fail_all_puts: AtomicBool,
    fail_all_gets: AtomicBool,
    fail_puts_after: AtomicUsize,
    put_attempts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new(destination_id: impl Into<String>, max_object_size: u64) -> Self {
        MemoryBlobStore {
            destination_id: destination_id.into(),
            max_object_size,
            supports_ranges: true,
            objects: Mutex::new(HashMap::new()),
            fail_next_puts: AtomicU32::new(0),
            fail_next_gets: AtomicU32::new(0),
            fail_all_puts: AtomicBool::new(false),
            fail_all_gets: AtomicBool::new(false),
            fail_puts_after: AtomicUsize::new(usize::MAX),
            put_attempts: AtomicUsize::new(0),
        }
    }

    /// Destination that ignores byte ranges and always serves full objects.
    pub fn without_range_support(mut self) -> Self {
        self.supports_ranges = false;
        self
    }

    /// The next `n` puts fail with a transient error.
    pub fn fail_next_puts(&self, n: u32) {
        self.fail_next_puts.store(n, Ordering::SeqCst);
    }

    /// The next `n` gets fail with a transient error.
    pub fn fail_next_gets(&self, n: u32) {
        self.fail_next_gets.store(n, Ordering::SeqCst);
    }

    /// Every put fails permanently (destination rejects content).
    pub fn fail_all_puts(&self, enabled: bool) {
        self.fail_all_puts.store(enabled, Ordering::SeqCst);
    }

    /// Every get fails as if the destination were unreachable.
    pub fn fail_all_gets(&self, enabled: bool) {
        self.fail_all_gets.store(enabled, Ordering::SeqCst);
    }

    /// Puts fail permanently once the store already holds `n` objects.
    pub fn fail_puts_after(&self, n: usize) {
        self.fail_puts_after.store(n, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("memory store poisoned").len()
    }

    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }

    fn take_injected_fault(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn destination_id(&self) -> &str {
        &self.destination_id
    }

    fn max_object_size(&self) -> u64 {
        self.max_object_size
    }

    fn supports_ranges(&self) -> bool {
        self.supports_ranges
    }

    async fn put(&self, data: Bytes) -> BlobResult<BlobRef> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);

        if self.fail_all_puts.load(Ordering::SeqCst) {
            return Err(BlobError::Permanent(format!(
                "destination {} rejects uploads",
                self.destination_id
            )));
        }
        if Self::take_injected_fault(&self.fail_next_puts) {
            return Err(BlobError::Transient("injected put fault".to_string()));
        }
        if self.object_count() >= self.fail_puts_after.load(Ordering::SeqCst) {
            return Err(BlobError::Permanent(format!(
                "destination {} is full",
                self.destination_id
            )));
        }

        let size = data.len() as u64;
        if size > self.max_object_size {
            return Err(BlobError::TooLarge {
                size,
                ceiling: self.max_object_size,
            });
        }

        let key = generate_blob_key();
        self.objects
            .lock()
            .expect("memory store poisoned")
            .insert(key.clone(), data);

        Ok(BlobRef { key, size })
    }

    async fn get(&self, blob: &BlobRef, range: Option<ByteRange>) -> BlobResult<ByteStream> {
        if self.fail_all_gets.load(Ordering::SeqCst) {
            return Err(BlobError::Transient(format!(
                "destination {} unreachable",
                self.destination_id
            )));
        }
        if Self::take_injected_fault(&self.fail_next_gets) {
            return Err(BlobError::Transient("injected get fault".to_string()));
        }

        let data = {
            let objects = self.objects.lock().expect("memory store poisoned");
            objects
                .get(&blob.key)
                .cloned()
                .ok_or_else(|| BlobError::NotFound(blob.key.clone()))?
        };

        let data = match range.filter(|_| self.supports_ranges) {
            Some(range) => {
                let range = range
                    .clamp(data.len() as u64)
                    .ok_or_else(|| BlobError::Permanent("range past end of object".to_string()))?;
                data.slice(range.start as usize..range.end as usize)
            }
            None => data,
        };

        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn exists(&self, blob: &BlobRef) -> BlobResult<bool> {
        if self.fail_all_gets.load(Ordering::SeqCst) {
            return Err(BlobError::Transient(format!(
                "destination {} unreachable",
                self.destination_id
            )));
        }
        Ok(self
            .objects
            .lock()
            .expect("memory store poisoned")
            .contains_key(&blob.key))
    }

    async fn delete(&self, blob: &BlobRef) -> BlobResult<()> {
        self.objects
            .lock()
            .expect("memory store poisoned")
            .remove(&blob.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::collect_stream;

    #[tokio::test]
    async fn round_trip_and_range() {
        let store = MemoryBlobStore::new("mem", 1024);
        let blob = store.put(Bytes::from_static(b"0123456789")).await.unwrap();

        let full = store.get(&blob, None).await.unwrap();
        assert_eq!(&collect_stream(full).await.unwrap()[..], b"0123456789");

        let range = ByteRange::new(3, 6).unwrap();
        let partial = store.get(&blob, Some(range)).await.unwrap();
        assert_eq!(&collect_stream(partial).await.unwrap()[..], b"345");
    }

    #[tokio::test]
    async fn range_ignored_without_support() {
        let store = MemoryBlobStore::new("mem", 1024).without_range_support();
        let blob = store.put(Bytes::from_static(b"0123456789")).await.unwrap();

        let range = ByteRange::new(3, 6).unwrap();
        let stream = store.get(&blob, Some(range)).await.unwrap();
        assert_eq!(&collect_stream(stream).await.unwrap()[..], b"0123456789");
    }

    #[tokio::test]
    async fn injected_faults_are_consumed() {
        let store = MemoryBlobStore::new("mem", 1024);
        store.fail_next_puts(2);

        assert!(store.put(Bytes::from_static(b"a")).await.is_err());
        assert!(store.put(Bytes::from_static(b"a")).await.is_err());
        assert!(store.put(Bytes::from_static(b"a")).await.is_ok());
        assert_eq!(store.put_attempts(), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_transient() {
        let store = MemoryBlobStore::new("mem", 1024);
        store.fail_all_puts(true);
        let err = store.put(Bytes::from_static(b"a")).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
