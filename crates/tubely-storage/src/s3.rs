use crate::keys::StorageKey;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Semaphore;

/// Buffered puts allowed in flight unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENT_PUTS: usize = 4;

/// S3 storage implementation
///
/// Each object is written with a single PUT of the fully read body.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    put_permits: Arc<Semaphore>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the standard AWS environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::with_store(Arc::new(store), bucket, region, endpoint_url))
    }

    /// Wrap an already-built object store (used with `InMemory` in tests).
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Self {
        S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            put_permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_PUTS)),
        }
    }

    /// Cap the number of bodies buffered for upload at once (at least one).
    pub fn with_max_concurrent_puts(mut self, max: usize) -> Self {
        self.put_permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    fn location(key: &StorageKey) -> Path {
        Path::from(key.as_str())
    }
}

#[async_trait]
impl Storage for S3Storage {
    /// The body is collected before the single PUT, so at most
    /// `max_concurrent_puts` bodies (each bounded by the upload ceiling) are held in
    /// memory at once; further puts wait for a slot.
    async fn put(
        &self,
        key: &StorageKey,
        content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredObject> {
        let start = std::time::Instant::now();

        let _permit = self
            .put_permits
            .acquire()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        let waited_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed reading source"
            );
            StorageError::UploadFailed(format!("Failed to read source for {}: {}", key, e))
        })?;
        let size_bytes = body.len() as u64;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let location = Self::location(key);
        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(Bytes::from(body)), opts)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size_bytes,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size_bytes,
            waited_ms = waited_ms,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(StoredObject {
            key: key.clone(),
            size_bytes,
            content_type: content_type.to_string(),
        })
    }

    /// Standard AWS format `https://{bucket}.s3.{region}.amazonaws.com/{key}`; path-style
    /// `{endpoint}/{bucket}/{key}` for S3-compatible providers.
    fn url_for(&self, key: &StorageKey) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Self::location(key);

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &StorageKey) -> StorageResult<bool> {
        let location = Self::location(key);
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    fn requires_seekable_source(&self) -> bool {
        true
    }
}
