//! Vidvault DB Library
//!
//! Manifest persistence: the [`ManifestStore`] trait plus a JSON-file-backed
//! implementation for production and an in-memory implementation for tests.

pub mod json;
pub mod store;

pub use json::JsonManifestStore;
pub use store::{ManifestStore, ManifestStoreError, MemoryManifestStore};
