//! Best-effort asynchronous backup replication.
//!
//! Replication never blocks an upload response and never changes a
//! manifest's state: each backup destination gets its own job, and the job
//! records its outcome in that destination's replica entry only.
//!
//! Jobs hold a [`Weak`] handle to the source bytes. The strong handle lives
//! in a [`SourceRetainer`] until every job for that video has run, so
//! deleting a video releases the bytes immediately and any not-yet-run jobs
//! record a "source unavailable" failure instead of re-uploading deleted
//! content.

use crate::error::ArchiveError;
use crate::retry::RetryPolicy;
use crate::uploader::upload_placement;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, Notify, Semaphore};
use uuid::Uuid;
use vidvault_core::plan;
use vidvault_db::ManifestStore;
use vidvault_storage::BlobStore;

/// One replication unit of work: copy one video to one backup destination.
pub struct ReplicationJob {
    pub video_id: Uuid,
    pub destination: Arc<dyn BlobStore>,
    pub source: Weak<Bytes>,
}

struct RetainedSource {
    // Held only to keep the Weak handles in outstanding jobs upgradeable.
    _bytes: Arc<Bytes>,
    pending_jobs: usize,
}

/// Keeps upload bytes alive while their replication jobs are outstanding.
#[derive(Default)]
pub struct SourceRetainer {
    inner: Mutex<HashMap<Uuid, RetainedSource>>,
}

impl SourceRetainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `bytes` for `jobs` outstanding replication jobs and hand back
    /// the weak reference the jobs should carry.
    pub fn retain(&self, video_id: Uuid, bytes: Arc<Bytes>, jobs: usize) -> Weak<Bytes> {
        let weak = Arc::downgrade(&bytes);
        if jobs > 0 {
            self.inner
                .lock()
                .expect("source retainer poisoned")
                .insert(
                    video_id,
                    RetainedSource {
                        _bytes: bytes,
                        pending_jobs: jobs,
                    },
                );
        }
        weak
    }

    /// One job for `video_id` finished; drop the source once none remain.
    pub(crate) fn release_one(&self, video_id: Uuid) {
        let mut inner = self.inner.lock().expect("source retainer poisoned");
        if let Some(retained) = inner.get_mut(&video_id) {
            retained.pending_jobs = retained.pending_jobs.saturating_sub(1);
            if retained.pending_jobs == 0 {
                inner.remove(&video_id);
            }
        }
    }

    /// Drop the source outright, used on video deletion. Outstanding jobs
    /// fail their upgrade and record the failure.
    pub fn drop_source(&self, video_id: Uuid) {
        self.inner
            .lock()
            .expect("source retainer poisoned")
            .remove(&video_id);
    }
}

/// Per-video write locks for replica-outcome recording.
///
/// Jobs for the same video may finish at the same time; without
/// serialization the slower read-modify-write would overwrite the faster
/// one's `backups` entry. Uploads run concurrently, only the manifest
/// update is serialized.
#[derive(Default)]
pub struct ManifestLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ManifestLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the write lock for one video's manifest.
    pub async fn acquire(&self, video_id: Uuid) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .inner
            .lock()
            .expect("manifest locks poisoned")
            .entry(video_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry once nothing else holds or awaits it.
    fn prune(&self, video_id: Uuid) {
        let mut inner = self.inner.lock().expect("manifest locks poisoned");
        if let Some(lock) = inner.get(&video_id) {
            if Arc::strong_count(lock) == 1 {
                inner.remove(&video_id);
            }
        }
    }
}

/// Run one replication job to completion and record the outcome in the
/// video's manifest. Public so tests can drive jobs synchronously.
pub async fn replicate(
    manifests: Arc<dyn ManifestStore>,
    locks: Arc<ManifestLocks>,
    destination: Arc<dyn BlobStore>,
    video_id: Uuid,
    source: Weak<Bytes>,
    retry: RetryPolicy,
) {
    let outcome = match source.upgrade() {
        None => Err("source unavailable: released before replication ran".to_string()),
        Some(bytes) => match plan(bytes.len() as u64, destination.max_object_size()) {
            Err(e) => Err(e.to_string()),
            Ok(placement_plan) => {
                upload_placement(destination.as_ref(), &bytes, &placement_plan, &retry)
                    .await
                    .map_err(|e| format!("segment {}: {}", e.segment, e.error))
            }
        },
    };

    match &outcome {
        Ok(placement) => tracing::info!(
            video_id = %video_id,
            destination = %destination.destination_id(),
            total_size = placement.total_size(),
            "Replication succeeded"
        ),
        Err(reason) => tracing::warn!(
            video_id = %video_id,
            destination = %destination.destination_id(),
            reason = %reason,
            "Replication failed"
        ),
    }

    // Read-modify-write of the replica entry only, under the video's write
    // lock so concurrent jobs never overwrite each other's entries. The
    // upload path has already finished with the primary fields by the time
    // jobs run.
    let guard = locks.acquire(video_id).await;
    match manifests.get(video_id).await {
        Ok(Some(mut manifest)) => {
            manifest.record_replica(destination.destination_id(), outcome);
            manifest.touch();
            if let Err(e) = manifests.put(&manifest).await {
                tracing::error!(
                    video_id = %video_id,
                    error = %e,
                    "Failed to persist replica outcome"
                );
            }
        }
        Ok(None) => tracing::warn!(
            video_id = %video_id,
            "Video deleted before replica outcome could be recorded"
        ),
        Err(e) => tracing::error!(
            video_id = %video_id,
            error = %e,
            "Failed to load manifest for replica outcome"
        ),
    }
    drop(guard);
    locks.prune(video_id);
}

/// Bounded replication worker pool.
///
/// Jobs queue on a bounded channel; at most `workers` run concurrently.
/// Shutdown stops accepting new jobs, runs whatever is already queued, and
/// waits for in-flight jobs to finish.
pub struct ReplicationQueue {
    tx: mpsc::Sender<ReplicationJob>,
    shutdown_tx: mpsc::Sender<()>,
    drained: Arc<Notify>,
}

impl ReplicationQueue {
    pub fn start(
        manifests: Arc<dyn ManifestStore>,
        retainer: Arc<SourceRetainer>,
        retry: RetryPolicy,
        workers: usize,
        queue_depth: usize,
    ) -> Self {
        let workers = workers.max(1);
        let (tx, mut rx) = mpsc::channel::<ReplicationJob>(queue_depth.max(1));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let drained = Arc::new(Notify::new());

        let drained_signal = drained.clone();
        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(workers));
            let locks = Arc::new(ManifestLocks::new());

            let dispatch = |job: ReplicationJob, permit| {
                let manifests = manifests.clone();
                let retainer = retainer.clone();
                let retry = retry.clone();
                let locks = locks.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let video_id = job.video_id;
                    replicate(manifests, locks, job.destination, video_id, job.source, retry)
                        .await;
                    retainer.release_one(video_id);
                });
            };

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Replication queue shutting down");
                        rx.close();
                        break;
                    }
                    job = rx.recv() => {
                        let Some(job) = job else { break };
                        let Ok(permit) = semaphore.clone().acquire_owned().await else {
                            break;
                        };
                        dispatch(job, permit);
                    }
                }
            }

            // Run jobs that were queued before shutdown, then wait for every
            // worker to finish before reporting the queue drained.
            while let Some(job) = rx.recv().await {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                dispatch(job, permit);
            }
            let _ = semaphore.acquire_many(workers as u32).await;

            tracing::info!("Replication queue drained");
            drained_signal.notify_one();
        });

        ReplicationQueue {
            tx,
            shutdown_tx,
            drained,
        }
    }

    pub async fn enqueue(&self, job: ReplicationJob) -> Result<(), ArchiveError> {
        self.tx
            .send(job)
            .await
            .map_err(|_| ArchiveError::ReplicationUnavailable)
    }

    /// Stop accepting jobs, run the backlog, and wait until all workers are
    /// idle.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
        self.drained.notified().await;
    }
}
