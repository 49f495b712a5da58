//! Storage setup and initialization

use std::sync::Arc;

use anyhow::Result;
use tubely_core::Config;
use tubely_storage::{create_storage, Storage};

/// Build the single storage backend this deployment writes to.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!(backend = %config.storage.backend, "Initializing storage...");
    let storage = create_storage(&config.storage).await?;
    tracing::info!(
        backend = ?storage.backend_type(),
        "Storage initialized successfully"
    );
    Ok(storage)
}
