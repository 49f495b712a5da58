//! Configuration module
//!
//! Process configuration is read from the environment (and a `.env` file when one is
//! present). Values that fail to parse fall back to their defaults; values that are
//! required but missing fail loading.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 8091;
const MAX_THUMBNAIL_SIZE_MB: u64 = 10;
const MAX_VIDEO_SIZE_MB: u64 = 1024;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGION: &str = "us-east-1";
const S3_MAX_CONCURRENT_PUTS: usize = 4;
const DEFAULT_THUMBNAIL_TYPES: &str = "image/jpeg,image/png";
const MIN_JWT_SECRET_LEN: usize = 32;

/// Where committed uploads live and how their URLs are formed.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Flat directory holding one file per key (local backend).
    pub assets_root: PathBuf,
    /// `http://<host>:<port>/assets`, prefix of every local retrieval URL.
    pub local_base_url: String,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, LocalStack).
    pub s3_endpoint: Option<String>,
    /// S3 puts buffer the whole body; this many may be in memory at once.
    pub s3_max_concurrent_puts: usize,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub storage: StorageConfig,
    pub max_thumbnail_size_bytes: u64,
    pub thumbnail_allowed_content_types: Vec<String>,
    pub max_video_size_bytes: u64,
    pub ffprobe_path: String,
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an explicit set of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port: u16 = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let backend = match var("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let assets_host = var("ASSETS_HOST").unwrap_or_else(|| "localhost".to_string());

        let storage = StorageConfig {
            backend,
            assets_root: PathBuf::from(var("ASSETS_ROOT").unwrap_or_else(|| "./assets".to_string())),
            local_base_url: format!("http://{}:{}/assets", assets_host.trim(), server_port),
            s3_bucket: var("S3_BUCKET").filter(|b| !b.trim().is_empty()),
            s3_region: var("S3_REGION")
                .or_else(|| var("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_endpoint: var("S3_ENDPOINT").filter(|e| !e.trim().is_empty()),
            s3_max_concurrent_puts: var("S3_MAX_CONCURRENT_PUTS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(S3_MAX_CONCURRENT_PUTS),
        };

        let max_thumbnail_size_mb = var("MAX_THUMBNAIL_SIZE_MB")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(MAX_THUMBNAIL_SIZE_MB);

        let max_video_size_mb = var("MAX_VIDEO_SIZE_MB")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(MAX_VIDEO_SIZE_MB);

        let max_thumbnail_size_bytes = megabytes_to_bytes("MAX_THUMBNAIL_SIZE_MB", max_thumbnail_size_mb)?;
        let max_video_size_bytes = megabytes_to_bytes("MAX_VIDEO_SIZE_MB", max_video_size_mb)?;

        let thumbnail_allowed_content_types = var("THUMBNAIL_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| DEFAULT_THUMBNAIL_TYPES.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            server_port,
            environment,
            jwt_secret: var("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            database_url: var("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage,
            max_thumbnail_size_bytes,
            thumbnail_allowed_content_types,
            max_video_size_bytes,
            ffprobe_path: var("FFPROBE_PATH").unwrap_or_else(|| "ffprobe".to_string()),
            scratch_dir: var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if let Some(ref url) = self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.max_thumbnail_size_bytes == 0 || self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size ceilings must be greater than zero"));
        }

        if self.storage.s3_max_concurrent_puts == 0 {
            return Err(anyhow::anyhow!("S3_MAX_CONCURRENT_PUTS must be greater than zero"));
        }

        if self.thumbnail_allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_ALLOWED_CONTENT_TYPES must list at least one media type"
            ));
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when using S3 storage backend"
            ));
        }

        Ok(())
    }
}

fn megabytes_to_bytes(name: &str, mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", name, mb))
}
