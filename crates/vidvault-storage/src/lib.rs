//! Vidvault Storage Library
//!
//! Blob backend adapters: the [`BlobStore`] trait models one logical
//! destination of an object-bearing store that enforces a per-object size
//! ceiling, and the implementations cover the local filesystem, S3-compatible
//! providers, and an in-memory store used by tests.
//!
//! # Key format
//!
//! Blob keys are destination-internal: `blobs/{uuid}`. Keys must not contain
//! `..` or a leading `/`; generation is centralized in the `keys` module so
//! all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::build_destinations;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{collect_stream, BlobError, BlobResult, BlobStore, ByteStream};
