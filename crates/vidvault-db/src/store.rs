use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use vidvault_core::Manifest;

#[derive(Debug, thiserror::Error)]
pub enum ManifestStoreError {
    #[error("Manifest not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt manifest record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable store for video manifests.
///
/// `put` replaces any existing record for the same video id. Readers never
/// observe a partially written manifest.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn put(&self, manifest: &Manifest) -> Result<(), ManifestStoreError>;

    async fn get(&self, video_id: Uuid) -> Result<Option<Manifest>, ManifestStoreError>;

    async fn delete(&self, video_id: Uuid) -> Result<(), ManifestStoreError>;

    async fn list(&self) -> Result<Vec<Manifest>, ManifestStoreError>;
}

/// In-memory manifest store used by tests.
#[derive(Default)]
pub struct MemoryManifestStore {
    manifests: RwLock<HashMap<Uuid, Manifest>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn put(&self, manifest: &Manifest) -> Result<(), ManifestStoreError> {
        self.manifests
            .write()
            .await
            .insert(manifest.video_id, manifest.clone());
        Ok(())
    }

    async fn get(&self, video_id: Uuid) -> Result<Option<Manifest>, ManifestStoreError> {
        Ok(self.manifests.read().await.get(&video_id).cloned())
    }

    async fn delete(&self, video_id: Uuid) -> Result<(), ManifestStoreError> {
        self.manifests.write().await.remove(&video_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Manifest>, ManifestStoreError> {
        Ok(self.manifests.read().await.values().cloned().collect())
    }
}
