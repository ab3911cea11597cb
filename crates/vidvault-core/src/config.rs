//! Configuration module
//!
//! Environment-driven configuration for the API server and the archive
//! service: server settings, primary and backup destination settings, and
//! upload/replication tuning.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::plan::DEFAULT_OBJECT_SIZE_CEILING;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_UPLOAD_SIZE_BYTES: usize = 2 * 1024 * 1024 * 1024;
const DEFAULT_REPLICATION_WORKERS: usize = 2;
const DEFAULT_REPLICATION_QUEUE_DEPTH: usize = 64;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Blob backend kinds a destination can be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    S3,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "s3" => Ok(BackendKind::S3),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::S3 => write!(f, "s3"),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Directory holding persisted manifests.
    pub data_dir: String,
    // Primary destination
    pub storage_backend: BackendKind,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers
    /// Per-object size ceiling the primary destination enforces.
    pub object_size_ceiling: u64,
    /// Backup destination roots (local paths), comma-separated in the env.
    pub backup_storage_paths: Vec<String>,
    // Upload / replication tuning
    pub max_upload_size_bytes: usize,
    pub upload_retry_max_attempts: u32,
    pub upload_retry_base_delay_ms: u64,
    pub replication_workers: usize,
    pub replication_queue_depth: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let storage_backend = env::var("VIDVAULT_STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(BackendKind::Local);

        Ok(Config {
            server_port: parse_env("VIDVAULT_PORT", DEFAULT_PORT)?,
            cors_origins: env_list("VIDVAULT_CORS_ORIGINS"),
            environment: env::var("VIDVAULT_ENV").unwrap_or_else(|_| "development".to_string()),
            data_dir: env::var("VIDVAULT_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            storage_backend,
            local_storage_path: env::var("VIDVAULT_STORAGE_PATH").ok(),
            s3_bucket: env::var("VIDVAULT_S3_BUCKET").ok(),
            s3_region: env::var("VIDVAULT_S3_REGION").ok(),
            s3_endpoint: env::var("VIDVAULT_S3_ENDPOINT").ok(),
            object_size_ceiling: parse_env(
                "VIDVAULT_OBJECT_SIZE_CEILING",
                DEFAULT_OBJECT_SIZE_CEILING,
            )?,
            backup_storage_paths: env_list("VIDVAULT_BACKUP_STORAGE_PATHS"),
            max_upload_size_bytes: parse_env(
                "VIDVAULT_MAX_UPLOAD_SIZE_BYTES",
                DEFAULT_MAX_UPLOAD_SIZE_BYTES,
            )?,
            upload_retry_max_attempts: parse_env(
                "VIDVAULT_UPLOAD_RETRY_MAX_ATTEMPTS",
                DEFAULT_RETRY_MAX_ATTEMPTS,
            )?,
            upload_retry_base_delay_ms: parse_env(
                "VIDVAULT_UPLOAD_RETRY_BASE_DELAY_MS",
                DEFAULT_RETRY_BASE_DELAY_MS,
            )?,
            replication_workers: parse_env(
                "VIDVAULT_REPLICATION_WORKERS",
                DEFAULT_REPLICATION_WORKERS,
            )?,
            replication_queue_depth: parse_env(
                "VIDVAULT_REPLICATION_QUEUE_DEPTH",
                DEFAULT_REPLICATION_QUEUE_DEPTH,
            )?,
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_round_trip() {
        assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!("S3".parse::<BackendKind>().unwrap(), BackendKind::S3);
        assert!("ftp".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::S3.to_string(), "s3");
    }
}
