#[cfg(feature = "storage-local")]
use crate::LocalBlobStore;
#[cfg(feature = "storage-s3")]
use crate::S3BlobStore;
use crate::{BlobError, BlobResult, BlobStore};
use std::sync::Arc;
use vidvault_core::{BackendKind, Config};

/// Build the primary destination from configuration.
pub async fn create_primary(config: &Config) -> BlobResult<Arc<dyn BlobStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        BackendKind::S3 => {
            let bucket = config.s3_bucket.clone().ok_or_else(|| {
                BlobError::Permanent("VIDVAULT_S3_BUCKET not configured".to_string())
            })?;
            let region = config.s3_region.clone().ok_or_else(|| {
                BlobError::Permanent("VIDVAULT_S3_REGION not configured".to_string())
            })?;
            let endpoint = config.s3_endpoint.clone();

            let store = S3BlobStore::new(
                "primary",
                bucket,
                region,
                endpoint,
                config.object_size_ceiling,
            )
            .await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        BackendKind::S3 => Err(BlobError::Permanent(
            "S3 backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        BackendKind::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                BlobError::Permanent("VIDVAULT_STORAGE_PATH not configured".to_string())
            })?;

            let store =
                LocalBlobStore::new("primary", base_path, config.object_size_ceiling).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        BackendKind::Local => Err(BlobError::Permanent(
            "Local backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

/// Build the backup destinations from configuration. Each configured backup
/// path becomes an independent local destination with its own identifier
/// (`backup-1`, `backup-2`, ...) so manifests can track them separately.
#[cfg(feature = "storage-local")]
pub async fn create_backups(config: &Config) -> BlobResult<Vec<Arc<dyn BlobStore>>> {
    let mut backups: Vec<Arc<dyn BlobStore>> = Vec::with_capacity(config.backup_storage_paths.len());

    for (i, path) in config.backup_storage_paths.iter().enumerate() {
        let store = LocalBlobStore::new(
            format!("backup-{}", i + 1),
            path.clone(),
            config.object_size_ceiling,
        )
        .await?;
        backups.push(Arc::new(store));
    }

    Ok(backups)
}

#[cfg(not(feature = "storage-local"))]
pub async fn create_backups(_config: &Config) -> BlobResult<Vec<Arc<dyn BlobStore>>> {
    Ok(Vec::new())
}

/// Build primary and backup destinations in one shot.
pub async fn build_destinations(
    config: &Config,
) -> BlobResult<(Arc<dyn BlobStore>, Vec<Arc<dyn BlobStore>>)> {
    let primary = create_primary(config).await?;
    let backups = create_backups(config).await?;
    Ok((primary, backups))
}
