//! Vidvault Archive Library
//!
//! The orchestration layer between the transport surface and the blob
//! destinations: upload placement, manifest bookkeeping, best-effort backup
//! replication, failover stream resolution, and per-video health probing.

pub mod archive;
pub mod destinations;
pub mod error;
pub mod health;
pub mod replication;
pub mod resolver;
pub mod retry;
pub mod uploader;

pub use archive::{ArchiveSettings, VideoArchive};
pub use destinations::Destinations;
pub use error::ArchiveError;
pub use health::{DestinationHealth, DestinationRole, HealthChecker, HealthReport, ProbeStatus};
pub use replication::{
    replicate, ManifestLocks, ReplicationJob, ReplicationQueue, SourceRetainer,
};
pub use resolver::{ResolvedStream, StreamResolver, VideoStream};
pub use retry::{with_retry, RetryPolicy};
pub use uploader::{upload_placement, SegmentUploadError, Uploader};
