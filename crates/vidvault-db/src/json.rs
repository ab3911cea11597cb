//! JSON-file manifest store.
//!
//! One file per video, `{video_id}.json`, under a configured directory.
//! Writes land in a uniquely named temp file in the same directory, get
//! fsynced, and are renamed into place, so a crash mid-write leaves either
//! the old record or the new one, never a torn file.

use crate::store::{ManifestStore, ManifestStoreError};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use uuid::Uuid;
use vidvault_core::Manifest;

pub struct JsonManifestStore {
    dir: PathBuf,
}

impl JsonManifestStore {
    /// Open (creating if needed) a manifest store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ManifestStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(JsonManifestStore { dir })
    }

    fn manifest_path(&self, video_id: Uuid) -> PathBuf {
        self.dir.join(format!("{video_id}.json"))
    }

    async fn read_manifest(path: &Path) -> Result<Manifest, ManifestStoreError> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ManifestStore for JsonManifestStore {
    async fn put(&self, manifest: &Manifest) -> Result<(), ManifestStoreError> {
        let path = self.manifest_path(manifest.video_id);
        let dir = self.dir.clone();
        let json = serde_json::to_vec_pretty(manifest)?;

        tokio::task::spawn_blocking(move || -> Result<(), ManifestStoreError> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&json)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| ManifestStoreError::Io(e.error))?;
            // Make the rename itself durable; failure here only costs
            // durability of the directory entry, not atomicity.
            if let Ok(handle) = std::fs::File::open(&dir) {
                let _ = handle.sync_all();
            }
            Ok(())
        })
        .await
        .map_err(|e| ManifestStoreError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            video_id = %manifest.video_id,
            version = manifest.version,
            "Manifest persisted"
        );

        Ok(())
    }

    async fn get(&self, video_id: Uuid) -> Result<Option<Manifest>, ManifestStoreError> {
        let path = self.manifest_path(video_id);
        match Self::read_manifest(&path).await {
            Ok(manifest) => Ok(Some(manifest)),
            Err(ManifestStoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, video_id: Uuid) -> Result<(), ManifestStoreError> {
        let path = self.manifest_path(video_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<Manifest>, ManifestStoreError> {
        let mut manifests = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_manifest(&path).await {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => {
                    // Skip unreadable records rather than failing the listing.
                    tracing::warn!(path = %path.display(), error = %e, "Skipping corrupt manifest file");
                }
            }
        }

        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn round_trip_and_delete() {
        let dir = tempdir().unwrap();
        let store = JsonManifestStore::open(dir.path()).await.unwrap();

        let manifest = Manifest::pending(Uuid::new_v4(), "primary");
        store.put(&manifest).await.unwrap();

        let fetched = store.get(manifest.video_id).await.unwrap().unwrap();
        assert_eq!(fetched.video_id, manifest.video_id);
        assert_eq!(fetched.primary_destination, "primary");

        store.delete(manifest.video_id).await.unwrap();
        assert!(store.get(manifest.video_id).await.unwrap().is_none());

        // Deleting a missing manifest is not an error.
        store.delete(manifest.video_id).await.unwrap();
    }

    #[tokio::test]
    async fn missing_manifest_is_none() {
        let dir = tempdir().unwrap();
        let store = JsonManifestStore::open(dir.path()).await.unwrap();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_skips_corrupt_files() {
        let dir = tempdir().unwrap();
        let store = JsonManifestStore::open(dir.path()).await.unwrap();

        store
            .put(&Manifest::pending(Uuid::new_v4(), "primary"))
            .await
            .unwrap();
        store
            .put(&Manifest::pending(Uuid::new_v4(), "primary"))
            .await
            .unwrap();

        tokio::fs::write(dir.path().join("garbage.json"), b"{not json")
            .await
            .unwrap();

        let manifests = store.list().await.unwrap();
        assert_eq!(manifests.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_puts_leave_one_clean_record() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonManifestStore::open(dir.path()).await.unwrap());

        let manifest = Manifest::pending(Uuid::new_v4(), "primary");
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let manifest = manifest.clone();
            tasks.push(tokio::spawn(async move { store.put(&manifest).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let fetched = store.get(manifest.video_id).await.unwrap().unwrap();
        assert_eq!(fetched.video_id, manifest.video_id);

        // Only the record itself may remain, no temp-file residue.
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(
            names,
            vec![std::ffi::OsString::from(format!(
                "{}.json",
                manifest.video_id
            ))]
        );
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let dir = tempdir().unwrap();
        let store = JsonManifestStore::open(dir.path()).await.unwrap();

        let mut manifest = Manifest::pending(Uuid::new_v4(), "primary");
        store.put(&manifest).await.unwrap();

        manifest.content_type = "video/webm".to_string();
        manifest.touch();
        store.put(&manifest).await.unwrap();

        let fetched = store.get(manifest.video_id).await.unwrap().unwrap();
        assert_eq!(fetched.content_type, "video/webm");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
