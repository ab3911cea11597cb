//! Upload orchestration: drive a placement plan against one destination and
//! keep the manifest honest about the outcome.
//!
//! Segments are uploaded strictly in plan order, one at a time, each under
//! the retry policy. A segment that fails permanently or exhausts its
//! attempts aborts the whole upload; segments already stored for the
//! aborted attempt are left in place, releasing them is the caller's
//! decision and is never retried here.

use crate::error::ArchiveError;
use crate::retry::{with_retry, RetryPolicy};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;
use vidvault_core::{
    plan, ChunkRecord, Manifest, Placement, PlacementMode, PlacementPlan,
};
use vidvault_db::ManifestStore;
use vidvault_storage::{BlobError, BlobStore};

/// Why a placement upload stopped.
#[derive(Debug)]
pub struct SegmentUploadError {
    pub segment: u32,
    pub attempts: u32,
    pub error: BlobError,
}

/// Upload every segment of `plan` from `source` to `store`, in order.
///
/// Public so replication jobs and tests can drive the same code path the
/// primary upload uses.
pub async fn upload_placement(
    store: &dyn BlobStore,
    source: &Bytes,
    plan: &PlacementPlan,
    retry: &RetryPolicy,
) -> Result<Placement, SegmentUploadError> {
    let mut chunks: Vec<ChunkRecord> = Vec::with_capacity(plan.segment_count());

    for segment in &plan.segments {
        let data = source.slice(segment.offset as usize..(segment.offset + segment.len) as usize);
        let result = with_retry(retry, || store.put(data.clone())).await;

        match result {
            Ok(blob) => chunks.push(ChunkRecord {
                index: segment.index,
                blob,
            }),
            Err((attempts, error)) => {
                tracing::warn!(
                    destination = %store.destination_id(),
                    segment = segment.index,
                    attempts,
                    error = %error,
                    "Segment upload failed, aborting placement"
                );
                return Err(SegmentUploadError {
                    segment: segment.index,
                    attempts,
                    error,
                });
            }
        }
    }

    Ok(match plan.mode {
        PlacementMode::Single => {
            // A single-mode plan has exactly one segment.
            let blob = chunks.remove(0).blob;
            Placement::Single { blob }
        }
        PlacementMode::Chunked => Placement::Chunked { chunks },
    })
}

pub struct Uploader {
    store: Arc<dyn BlobStore>,
    manifests: Arc<dyn ManifestStore>,
    retry: RetryPolicy,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn BlobStore>,
        manifests: Arc<dyn ManifestStore>,
        retry: RetryPolicy,
    ) -> Self {
        Uploader {
            store,
            manifests,
            retry,
        }
    }

    /// Store `source` at the primary destination and persist the manifest.
    ///
    /// The manifest is persisted in `Pending` state before any bytes move,
    /// then re-persisted as `Available` or `Failed` once the outcome is
    /// known. Empty sources are rejected before a manifest is created.
    pub async fn upload(
        &self,
        video_id: Uuid,
        source: &Bytes,
        original_name: Option<String>,
        content_type: String,
    ) -> Result<Manifest, ArchiveError> {
        let placement_plan = plan(source.len() as u64, self.store.max_object_size())?;

        let mut manifest = Manifest::pending(video_id, self.store.destination_id());
        manifest.original_name = original_name;
        manifest.content_type = content_type;
        manifest.touch();
        self.manifests.put(&manifest).await?;

        tracing::info!(
            video_id = %video_id,
            destination = %self.store.destination_id(),
            size_bytes = source.len(),
            mode = %placement_plan.mode,
            segments = placement_plan.segment_count(),
            "Starting video upload"
        );

        match upload_placement(self.store.as_ref(), source, &placement_plan, &self.retry).await {
            Ok(placement) => {
                let checksum = sha256_hex(source);
                manifest.complete_primary(placement, Some(checksum));
                manifest.touch();
                self.manifests.put(&manifest).await?;

                tracing::info!(
                    video_id = %video_id,
                    total_size = manifest.total_size,
                    "Video upload complete"
                );
                Ok(manifest)
            }
            Err(failure) => {
                manifest.fail_primary();
                manifest.touch();
                self.manifests.put(&manifest).await?;

                Err(ArchiveError::UploadFailed {
                    segment: failure.segment,
                    attempts: failure.attempts,
                    source: failure.error,
                })
            }
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_hex() {
        let a = sha256_hex(b"hello");
        let b = sha256_hex(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
