//! Types for the ingestion pipeline.

use std::io;

use tokio::io::AsyncRead;
use tubely_core::{AppError, AspectRatio};
use tubely_storage::{StorageError, StorageKey};
use uuid::Uuid;

use crate::validator::ValidationError;

/// The only container accepted on the video path.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// One inbound upload. Consumed by a single pipeline run.
pub struct UploadRequest<R> {
    pub body: R,
    /// Client-declared type, untrusted. Reconciled with the sniffed type.
    pub declared_content_type: Option<String>,
    /// Client-declared length (e.g. Content-Length), untrusted. Only used to reject early.
    pub declared_size: Option<u64>,
    /// Authenticated identity that owns `video_id`.
    pub owner_id: Uuid,
    pub video_id: Uuid,
}

impl<R: AsyncRead + Send + Unpin> UploadRequest<R> {
    pub fn new(body: R, owner_id: Uuid, video_id: Uuid) -> Self {
        Self {
            body,
            declared_content_type: None,
            declared_size: None,
            owner_id,
            video_id,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }
}

/// Per-path acceptance rules.
#[derive(Debug, Clone)]
pub struct IngestPolicy {
    pub max_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    /// Probe the staged file for its aspect ratio before committing.
    pub probe_aspect_ratio: bool,
}

impl IngestPolicy {
    pub fn thumbnail(max_size_bytes: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_size_bytes,
            allowed_content_types,
            probe_aspect_ratio: false,
        }
    }

    pub fn video(max_size_bytes: u64) -> Self {
        Self {
            max_size_bytes,
            allowed_content_types: vec![VIDEO_CONTENT_TYPE.to_string()],
            probe_aspect_ratio: true,
        }
    }
}

/// Result of a committed upload.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub key: StorageKey,
    /// Retrieval URL; the only value callers persist.
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub aspect_ratio: Option<AspectRatio>,
    /// Why probing failed, when it was attempted and did.
    pub probe_error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Upload exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to read upload body: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to stage upload: {0}")]
    Staging(#[source] io::Error),

    #[error("Failed to commit {key} to storage: {source}")]
    StorageCommit {
        key: StorageKey,
        #[source]
        source: StorageError,
    },
}

impl IngestError {
    /// Whether the client caused the failure (nothing was committed, retrying the
    /// same request will fail again).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::PayloadTooLarge { .. } | IngestError::Validation(_) | IngestError::Read(_)
        )
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(format!(
                "Upload exceeds the maximum size of {} bytes",
                limit
            )),
            IngestError::Validation(ValidationError::EmptyFile) => {
                AppError::InvalidInput("Uploaded file is empty".to_string())
            }
            IngestError::Validation(e @ ValidationError::UnrecognizedContent { .. }) => {
                AppError::UnsupportedMediaType(e.to_string())
            }
            IngestError::Validation(e @ ValidationError::ContentTypeMismatch { .. }) => {
                AppError::UnsupportedMediaType(e.to_string())
            }
            IngestError::Validation(e @ ValidationError::InvalidContentType { .. }) => {
                AppError::UnsupportedMediaType(e.to_string())
            }
            IngestError::Read(e) => {
                AppError::InvalidInput(format!("Failed to read upload body: {}", e))
            }
            IngestError::Staging(e) => AppError::Internal(format!("Failed to stage upload: {}", e)),
            e @ IngestError::StorageCommit { .. } => AppError::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_core::ErrorMetadata;

    #[test]
    fn test_policies() {
        let video = IngestPolicy::video(1 << 30);
        assert_eq!(video.allowed_content_types, vec!["video/mp4".to_string()]);
        assert!(video.probe_aspect_ratio);

        let thumb = IngestPolicy::thumbnail(10 << 20, vec!["image/png".to_string()]);
        assert!(!thumb.probe_aspect_ratio);
    }

    #[test]
    fn test_error_mapping() {
        let cases: Vec<(IngestError, u16)> = vec![
            (IngestError::PayloadTooLarge { limit: 10 }, 413),
            (ValidationError::EmptyFile.into(), 400),
            (
                ValidationError::InvalidContentType {
                    content_type: "image/png".into(),
                    allowed: vec!["video/mp4".into()],
                }
                .into(),
                415,
            ),
            (
                IngestError::Read(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")),
                400,
            ),
            (
                IngestError::StorageCommit {
                    key: StorageKey::generate("video/mp4"),
                    source: StorageError::UploadFailed("denied".into()),
                },
                500,
            ),
        ];

        for (err, status) in cases {
            let client = err.is_client_error();
            let app: AppError = err.into();
            assert_eq!(app.http_status_code(), status);
            assert_eq!(client, status < 500);
        }
    }
}
