//! The archive facade: one object the transport layer talks to.

use crate::destinations::Destinations;
use crate::error::ArchiveError;
use crate::health::{HealthChecker, HealthReport};
use crate::replication::{ReplicationJob, ReplicationQueue, SourceRetainer};
use crate::resolver::{ResolvedStream, StreamResolver};
use crate::retry::RetryPolicy;
use crate::uploader::Uploader;
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;
use vidvault_core::{ByteRange, Manifest, Placement};
use vidvault_db::ManifestStore;
use vidvault_storage::BlobStore;

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub retry: RetryPolicy,
    pub replication_workers: usize,
    pub replication_queue_depth: usize,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        ArchiveSettings {
            retry: RetryPolicy::default(),
            replication_workers: 2,
            replication_queue_depth: 64,
        }
    }
}

pub struct VideoArchive {
    destinations: Arc<Destinations>,
    manifests: Arc<dyn ManifestStore>,
    uploader: Uploader,
    resolver: StreamResolver,
    health: HealthChecker,
    replication: ReplicationQueue,
    retainer: Arc<SourceRetainer>,
}

impl VideoArchive {
    pub fn new(
        primary: Arc<dyn BlobStore>,
        backups: Vec<Arc<dyn BlobStore>>,
        manifests: Arc<dyn ManifestStore>,
        settings: ArchiveSettings,
    ) -> Self {
        let destinations = Arc::new(Destinations::new(primary.clone(), backups));
        let retainer = Arc::new(SourceRetainer::new());
        let replication = ReplicationQueue::start(
            manifests.clone(),
            retainer.clone(),
            settings.retry.clone(),
            settings.replication_workers,
            settings.replication_queue_depth,
        );

        VideoArchive {
            uploader: Uploader::new(primary, manifests.clone(), settings.retry),
            resolver: StreamResolver::new(destinations.clone()),
            health: HealthChecker::new(destinations.clone()),
            destinations,
            manifests,
            replication,
            retainer,
        }
    }

    /// Store a video and schedule its backup replication.
    ///
    /// Returns once the primary placement is durable; replication to backup
    /// destinations proceeds in the background and is best-effort.
    pub async fn upload_video(
        &self,
        source: Bytes,
        original_name: Option<String>,
        content_type: String,
    ) -> Result<Manifest, ArchiveError> {
        let video_id = Uuid::new_v4();
        let source = Arc::new(source);

        let manifest = self
            .uploader
            .upload(video_id, &source, original_name, content_type)
            .await?;

        let backups = self.destinations.backups();
        if !backups.is_empty() {
            let weak = self
                .retainer
                .retain(video_id, source.clone(), backups.len());

            for backup in backups {
                let job = ReplicationJob {
                    video_id,
                    destination: backup.clone(),
                    source: weak.clone(),
                };
                if let Err(e) = self.replication.enqueue(job).await {
                    tracing::warn!(
                        video_id = %video_id,
                        destination = %backup.destination_id(),
                        error = %e,
                        "Could not schedule replication"
                    );
                    self.retainer.release_one(video_id);
                }
            }
        }

        Ok(manifest)
    }

    pub async fn manifest(&self, video_id: Uuid) -> Result<Manifest, ArchiveError> {
        self.manifests
            .get(video_id)
            .await?
            .ok_or(ArchiveError::NotFound(video_id))
    }

    /// All manifests, newest first.
    pub async fn list_videos(&self) -> Result<Vec<Manifest>, ArchiveError> {
        let mut manifests = self.manifests.list().await?;
        manifests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(manifests)
    }

    pub async fn resolve(
        &self,
        manifest: &Manifest,
        range: Option<ByteRange>,
    ) -> Result<ResolvedStream, ArchiveError> {
        self.resolver.resolve(manifest, range).await
    }

    /// Fetch the manifest and resolve its content in one step.
    pub async fn open_stream(
        &self,
        video_id: Uuid,
        range: Option<ByteRange>,
    ) -> Result<(Manifest, ResolvedStream), ArchiveError> {
        let manifest = self.manifest(video_id).await?;
        let resolved = self.resolver.resolve(&manifest, range).await?;
        Ok((manifest, resolved))
    }

    /// Remove a video everywhere. Primary objects are deleted before the
    /// manifest disappears; backup cleanup proceeds in the background.
    pub async fn delete_video(&self, video_id: Uuid) -> Result<(), ArchiveError> {
        let manifest = self.manifest(video_id).await?;

        // Any replication still waiting for this source must not run.
        self.retainer.drop_source(video_id);

        if let Some(placement) = &manifest.placement {
            if let Some(store) = self.destinations.get(&manifest.primary_destination) {
                delete_placement(store.as_ref(), placement).await;
            }
        }

        for replica in manifest.succeeded_replicas() {
            let (Some(store), Some(placement)) = (
                self.destinations.get(&replica.destination),
                replica.placement.clone(),
            ) else {
                continue;
            };
            let store = store.clone();
            tokio::spawn(async move {
                delete_placement(store.as_ref(), &placement).await;
            });
        }

        self.manifests.delete(video_id).await?;

        tracing::info!(video_id = %video_id, "Video deleted");
        Ok(())
    }

    /// Probe every configured destination for this video's content.
    pub async fn check_video(&self, video_id: Uuid) -> Result<HealthReport, ArchiveError> {
        let manifest = self.manifest(video_id).await?;
        self.health.check(&manifest).await
    }

    /// Drain the replication queue. Call before process exit.
    pub async fn shutdown(&self) {
        self.replication.shutdown().await;
    }
}

async fn delete_placement(store: &dyn BlobStore, placement: &Placement) {
    for blob in placement.blob_refs() {
        if let Err(e) = store.delete(blob).await {
            tracing::warn!(
                destination = %store.destination_id(),
                key = %blob.key,
                error = %e,
                "Failed to delete stored object"
            );
        }
    }
}
