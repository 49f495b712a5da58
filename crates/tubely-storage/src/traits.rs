//! Storage abstraction trait
//!
//! This module defines the Storage trait that every backend implements.

use crate::keys::StorageKey;
use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata of an object after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: StorageKey,
    pub size_bytes: u64,
    pub content_type: String,
}

/// Storage abstraction trait
///
/// Both backends share one commit contract: after `put` returns `Ok`, the object is
/// fully retrievable at `url_for(key)`; after it returns `Err`, nothing is resolvable
/// under that key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stream `reader` to EOF and commit it under `key`.
    async fn put(
        &self,
        key: &StorageKey,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredObject>;

    /// Retrieval URL for `key`. Pure function of the key and static configuration.
    fn url_for(&self, key: &StorageKey) -> String;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &StorageKey) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &StorageKey) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Whether `put` needs a source that is already resident on local disk.
    fn requires_seekable_source(&self) -> bool {
        false
    }
}
