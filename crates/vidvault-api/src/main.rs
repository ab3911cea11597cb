use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vidvault_api::state::AppState;
use vidvault_api::{routes, server, telemetry};
use vidvault_archive::{ArchiveSettings, RetryPolicy, VideoArchive};
use vidvault_core::Config;
use vidvault_db::{JsonManifestStore, ManifestStore};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init(config.is_production());

    let (primary, backups) = vidvault_storage::build_destinations(&config).await?;

    let manifest_dir = PathBuf::from(&config.data_dir).join("manifests");
    let manifests: Arc<dyn ManifestStore> = Arc::new(JsonManifestStore::open(manifest_dir).await?);

    let settings = ArchiveSettings {
        retry: RetryPolicy::new(
            config.upload_retry_max_attempts,
            Duration::from_millis(config.upload_retry_base_delay_ms),
        ),
        replication_workers: config.replication_workers,
        replication_queue_depth: config.replication_queue_depth,
    };
    let archive = Arc::new(VideoArchive::new(primary, backups, manifests, settings));

    let state = Arc::new(AppState {
        archive: archive.clone(),
        max_upload_size: config.max_upload_size_bytes,
    });
    let router = routes::build_router(state, &config)?;

    server::start_server(&config, router, archive).await
}
