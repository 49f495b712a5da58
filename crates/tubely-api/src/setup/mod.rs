//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use tubely_core::Config;
use tubely_infra::{init_telemetry, LogFormat};
use tubely_processing::FfprobeProbe;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    init_telemetry(LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(environment = %config.environment, "Configuration loaded and validated successfully");

    tokio::fs::create_dir_all(&config.scratch_dir)
        .await
        .with_context(|| format!("Failed to create scratch dir {}", config.scratch_dir.display()))?;

    let storage = storage::setup_storage(&config).await?;
    let videos = database::setup_video_store(&config).await?;
    let probe = Arc::new(FfprobeProbe::new(config.ffprobe_path.clone()));

    let state = Arc::new(AppState::new(config.clone(), videos, storage, probe));
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
