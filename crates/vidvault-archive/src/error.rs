use uuid::Uuid;
use vidvault_core::PlanError;
use vidvault_db::ManifestStoreError;
use vidvault_storage::BlobError;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    ManifestStore(#[from] ManifestStoreError),

    #[error("Upload of segment {segment} failed after {attempts} attempts: {source}")]
    UploadFailed {
        segment: u32,
        attempts: u32,
        source: BlobError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] BlobError),

    /// The manifest exists but its content cannot be served: still pending,
    /// terminally failed, or every holding destination is unreachable.
    #[error("Video content unavailable: {0}")]
    ContentUnavailable(String),

    /// Chunked reconstruction could not continue past the given byte offset.
    #[error("Reconstruction failed at byte offset {offset}")]
    Reconstruction { offset: u64 },

    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("Replication queue is no longer accepting jobs")]
    ReplicationUnavailable,
}
