//! Per-video redundancy probing.
//!
//! A destination is probed by checking the existence of its placement's
//! probe reference (the single object, or the first chunk). Probes are
//! cheap existence checks, not full reads.

use crate::destinations::Destinations;
use crate::error::ArchiveError;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use vidvault_core::{Manifest, ManifestState, Placement, ReplicaStatus};
use vidvault_storage::BlobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationRole {
    Primary,
    Backup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStatus {
    Reachable,
    Unreachable,
    /// The destination is configured but holds no replica of this video.
    NotReplicated,
}

#[derive(Debug, Serialize)]
pub struct DestinationHealth {
    pub destination: String,
    pub role: DestinationRole,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub video_id: Uuid,
    pub state: ManifestState,
    /// Number of destinations currently able to serve the content.
    pub redundancy: usize,
    pub destinations: Vec<DestinationHealth>,
}

pub struct HealthChecker {
    destinations: Arc<Destinations>,
}

impl HealthChecker {
    pub fn new(destinations: Arc<Destinations>) -> Self {
        HealthChecker { destinations }
    }

    pub async fn check(&self, manifest: &Manifest) -> Result<HealthReport, ArchiveError> {
        let mut report = Vec::new();

        let primary = self.destinations.primary();
        report.push(
            probe_destination(
                primary.as_ref(),
                DestinationRole::Primary,
                manifest.placement.as_ref(),
            )
            .await,
        );

        for backup in self.destinations.backups() {
            let placement = manifest
                .backups
                .get(backup.destination_id())
                .filter(|r| r.status == ReplicaStatus::Succeeded)
                .and_then(|r| r.placement.as_ref());

            let mut health =
                probe_destination(backup.as_ref(), DestinationRole::Backup, placement).await;

            // Surface why a backup holds nothing, if we know.
            if health.status == ProbeStatus::NotReplicated {
                if let Some(replica) = manifest.backups.get(backup.destination_id()) {
                    health.detail = replica.error.clone();
                }
            }
            report.push(health);
        }

        let redundancy = report
            .iter()
            .filter(|d| d.status == ProbeStatus::Reachable)
            .count();

        Ok(HealthReport {
            video_id: manifest.video_id,
            state: manifest.state,
            redundancy,
            destinations: report,
        })
    }
}

async fn probe_destination(
    store: &dyn BlobStore,
    role: DestinationRole,
    placement: Option<&Placement>,
) -> DestinationHealth {
    let destination = store.destination_id().to_string();

    let Some(probe) = placement.and_then(Placement::probe_ref) else {
        return DestinationHealth {
            destination,
            role,
            status: ProbeStatus::NotReplicated,
            detail: None,
        };
    };

    match store.exists(probe).await {
        Ok(true) => DestinationHealth {
            destination,
            role,
            status: ProbeStatus::Reachable,
            detail: None,
        },
        Ok(false) => DestinationHealth {
            destination,
            role,
            status: ProbeStatus::Unreachable,
            detail: Some("stored object missing".to_string()),
        },
        Err(e) => DestinationHealth {
            destination,
            role,
            status: ProbeStatus::Unreachable,
            detail: Some(e.to_string()),
        },
    }
}
