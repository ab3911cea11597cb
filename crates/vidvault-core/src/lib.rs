//! Vidvault Core Library
//!
//! This crate provides the domain models, placement planner, and configuration
//! shared across all vidvault components: blob references, chunk records,
//! manifests, byte ranges, and the pure chunking logic that maps a source file
//! onto size-capped backend objects.

pub mod config;
pub mod models;
pub mod plan;

// Re-export commonly used types
pub use config::{BackendKind, Config};
pub use models::manifest::{
    BlobRef, ChunkRecord, Manifest, ManifestState, Placement, PlacementMode, Replica,
    ReplicaStatus,
};
pub use models::range::ByteRange;
pub use plan::{plan, PlacementPlan, PlanError, Segment, DEFAULT_OBJECT_SIZE_CEILING};
