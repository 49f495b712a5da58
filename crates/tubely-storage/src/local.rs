use crate::keys::StorageKey;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncRead;

/// Mode of the assets directory.
const DIR_MODE: u32 = 0o755;
/// Mode of committed asset files.
const FILE_MODE: u32 = 0o644;
const TEMP_PREFIX: &str = ".upload-";

/// Local filesystem storage implementation
///
/// Objects live in one flat directory, one file per key. Writes go to a temporary
/// file in the same directory and are renamed onto the key only after the copy and
/// fsync succeed, so an interrupted upload never leaves a truncated file at a
/// resolvable path.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Assets directory (e.g., "./assets"), created if missing
    /// * `base_url` - Base URL the directory is served under (e.g., "http://localhost:8091/assets")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        Self::ensure_dir(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.into(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Filesystem path an object is (or would be) stored at.
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.base_path.join(key.as_str())
    }

    async fn ensure_dir(path: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder.create(path).await
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        key: &StorageKey,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredObject> {
        let path = self.path_for(key);
        let start = std::time::Instant::now();

        // The directory may have been removed since startup.
        Self::ensure_dir(&self.base_path).await?;

        let (std_file, temp_path) = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.base_path)
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create temp file in {}: {}",
                    self.base_path.display(),
                    e
                ))
            })?
            .into_parts();
        let mut file = fs::File::from_std(std_file);

        let size_bytes = match tokio::io::copy(reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage put failed"
                );
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream for {}: {}",
                    key, e
                )));
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(FILE_MODE))
                .await?;
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file for {}: {}", key, e))
        })?;
        drop(file);

        temp_path.persist(&path).map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to move upload into {}: {}",
                path.display(),
                e.error
            ))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(StoredObject {
            key: key.clone(),
            size_bytes,
            content_type: content_type.to_string(),
        })
    }

    fn url_for(&self, key: &StorageKey) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        let path = self.path_for(key);
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &StorageKey) -> StorageResult<bool> {
        Ok(fs::try_exists(self.path_for(key)).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
