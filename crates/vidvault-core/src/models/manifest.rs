use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

/// Opaque reference to one stored object, scoped to a single destination.
///
/// Issued by a successful upload and immutable afterwards. The key means
/// nothing outside the destination that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: String,
    pub size: u64,
}

/// One piece of a chunked placement. Reconstruction concatenates chunks
/// strictly by ascending `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: u32,
    pub blob: BlobRef,
}

impl ChunkRecord {
    pub fn size(&self) -> u64 {
        self.blob.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    Single,
    Chunked,
}

impl Display for PlacementMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PlacementMode::Single => write!(f, "single"),
            PlacementMode::Chunked => write!(f, "chunked"),
        }
    }
}

/// How a video's bytes map onto backend objects at one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Placement {
    Single { blob: BlobRef },
    Chunked { chunks: Vec<ChunkRecord> },
}

impl Placement {
    pub fn mode(&self) -> PlacementMode {
        match self {
            Placement::Single { .. } => PlacementMode::Single,
            Placement::Chunked { .. } => PlacementMode::Chunked,
        }
    }

    /// Sum of stored object sizes.
    pub fn total_size(&self) -> u64 {
        match self {
            Placement::Single { blob } => blob.size,
            Placement::Chunked { chunks } => chunks.iter().map(|c| c.blob.size).sum(),
        }
    }

    /// All blob references in this placement, in chunk order.
    pub fn blob_refs(&self) -> Vec<&BlobRef> {
        match self {
            Placement::Single { blob } => vec![blob],
            Placement::Chunked { chunks } => chunks.iter().map(|c| &c.blob).collect(),
        }
    }

    /// The reference a cheap reachability probe should target: the single
    /// blob, or the first chunk of a chunked placement.
    pub fn probe_ref(&self) -> Option<&BlobRef> {
        match self {
            Placement::Single { blob } => Some(blob),
            Placement::Chunked { chunks } => chunks.first().map(|c| &c.blob),
        }
    }

    pub fn chunk(&self, index: u32) -> Option<&ChunkRecord> {
        match self {
            Placement::Single { .. } => None,
            Placement::Chunked { chunks } => chunks.iter().find(|c| c.index == index),
        }
    }
}

/// Per-destination replication outcome. Backups move independently through
/// `not-attempted -> succeeded | failed` and never affect the manifest's
/// own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplicaStatus {
    NotAttempted,
    Succeeded,
    Failed,
}

impl Display for ReplicaStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReplicaStatus::NotAttempted => write!(f, "not-attempted"),
            ReplicaStatus::Succeeded => write!(f, "succeeded"),
            ReplicaStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    pub destination: String,
    pub status: ReplicaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestState {
    Pending,
    Available,
    Failed,
}

impl Display for ManifestState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ManifestState::Pending => write!(f, "pending"),
            ManifestState::Available => write!(f, "available"),
            ManifestState::Failed => write!(f, "failed"),
        }
    }
}

/// The durable record of where one video's bytes live.
///
/// Created in `Pending` state at upload start, moved to `Available` once the
/// primary placement fully succeeds, `Failed` (terminal) otherwise. Backups
/// only ever increase reported redundancy. The record is versioned: every
/// persisted write bumps `version`, and concurrent writers touch disjoint
/// subfields (the upload path owns the primary fields, each replication task
/// owns its own entry in `backups`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub video_id: Uuid,
    pub primary_destination: String,
    pub state: ManifestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub backups: BTreeMap<String, Replica>,
    pub total_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    pub content_type: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    /// New manifest at upload start, before any bytes have been stored.
    pub fn pending(video_id: Uuid, primary_destination: impl Into<String>) -> Self {
        let now = Utc::now();
        Manifest {
            video_id,
            primary_destination: primary_destination.into(),
            state: ManifestState::Pending,
            placement: None,
            backups: BTreeMap::new(),
            total_size: 0,
            checksum: None,
            original_name: None,
            content_type: "video/mp4".to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mode(&self) -> Option<PlacementMode> {
        self.placement.as_ref().map(Placement::mode)
    }

    /// Bump the version and updated timestamp; call before every persisted write.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Record the outcome of one primary placement attempt.
    pub fn complete_primary(&mut self, placement: Placement, checksum: Option<String>) {
        self.total_size = placement.total_size();
        self.placement = Some(placement);
        self.checksum = checksum;
        self.state = ManifestState::Available;
    }

    pub fn fail_primary(&mut self) {
        self.state = ManifestState::Failed;
    }

    /// Record the outcome of one backup destination's replication attempt.
    /// Touches only that destination's entry.
    pub fn record_replica(&mut self, destination: &str, outcome: Result<Placement, String>) {
        let (status, placement, error) = match outcome {
            Ok(placement) => (ReplicaStatus::Succeeded, Some(placement), None),
            Err(reason) => (ReplicaStatus::Failed, None, Some(reason)),
        };
        self.backups.insert(
            destination.to_string(),
            Replica {
                destination: destination.to_string(),
                status,
                placement,
                error,
                updated_at: Utc::now(),
            },
        );
    }

    /// Backup replicas that fully succeeded, in destination order.
    pub fn succeeded_replicas(&self) -> impl Iterator<Item = &Replica> {
        self.backups
            .values()
            .filter(|r| r.status == ReplicaStatus::Succeeded && r.placement.is_some())
    }

    /// Check the structural invariants: total size equals the sum of chunk
    /// sizes, chunk indices are exactly `0..n` with no gaps or duplicates,
    /// and `Available` implies a complete primary placement.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.state, &self.placement) {
            (ManifestState::Available, None) => {
                return Err("available manifest has no primary placement".to_string());
            }
            (_, Some(placement)) => {
                validate_placement(placement)?;
                if placement.total_size() != self.total_size {
                    return Err(format!(
                        "total size {} does not match placement size {}",
                        self.total_size,
                        placement.total_size()
                    ));
                }
            }
            _ => {}
        }
        for replica in self.backups.values() {
            if let Some(ref placement) = replica.placement {
                validate_placement(placement)?;
            }
        }
        Ok(())
    }
}

fn validate_placement(placement: &Placement) -> Result<(), String> {
    if let Placement::Chunked { chunks } = placement {
        if chunks.is_empty() {
            return Err("chunked placement has no chunks".to_string());
        }
        for (position, chunk) in chunks.iter().enumerate() {
            if chunk.index as usize != position {
                return Err(format!(
                    "chunk at position {} has index {}",
                    position, chunk.index
                ));
            }
        }
    }
    Ok(())
}
