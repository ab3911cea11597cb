//! Vidvault API
//!
//! The HTTP surface over the archive: multipart upload, range-aware
//! streaming, manifest listing, deletion, and per-video health reports.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;
