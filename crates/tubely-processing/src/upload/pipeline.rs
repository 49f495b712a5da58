//! Ingestion pipeline: size bound → sniff/validate → stage → probe → commit → URL.
//!
//! Rejections that depend only on the request (declared size, content sniffing) happen
//! before any scratch file exists. Once a scratch file exists it is owned by a
//! [`TempPath`] guard, so it is removed on every exit path, including the request
//! future being dropped when the client disconnects.

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tubely_storage::{Storage, StorageKey, StoredObject};

use super::limit::SizeLimitedReader;
use super::types::{IngestError, IngestOutcome, IngestPolicy, UploadRequest};
use crate::validator::{MediaValidator, SNIFF_LEN};
use crate::video::MediaProbe;

const SCRATCH_PREFIX: &str = "tubely-upload-";
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Request-scoped staging file; dropping it deletes the file.
struct ScratchFile {
    file: File,
    path: TempPath,
}

#[derive(Clone)]
pub struct IngestionPipeline {
    storage: Arc<dyn Storage>,
    probe: Arc<dyn MediaProbe>,
    scratch_dir: PathBuf,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        probe: Arc<dyn MediaProbe>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            probe,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Ingest one upload and return where it can be retrieved.
    ///
    /// The caller is responsible for authorization: the pipeline assumes
    /// `request.owner_id` may write to `request.video_id`.
    #[tracing::instrument(
        skip(self, request, policy),
        fields(video_id = %request.video_id, owner_id = %request.owner_id)
    )]
    pub async fn ingest<R>(
        &self,
        request: UploadRequest<R>,
        policy: &IngestPolicy,
    ) -> Result<IngestOutcome, IngestError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let start = std::time::Instant::now();
        let limit = policy.max_size_bytes;

        if let Some(declared) = request.declared_size {
            if declared > limit {
                tracing::debug!(declared_size = declared, limit, "Upload rejected by declared size");
                return Err(IngestError::PayloadTooLarge { limit });
            }
        }

        let mut body = SizeLimitedReader::new(request.body, limit);

        let head = read_head(&mut body)
            .await
            .map_err(|e| read_failure(&body, e))?;

        let validator = MediaValidator::new(policy.allowed_content_types.clone());
        let content_type = validator.validate(request.declared_content_type.as_deref(), &head)?;

        let needs_staging = policy.probe_aspect_ratio || self.storage.requires_seekable_source();

        let (stored, aspect_ratio, probe_error) = if needs_staging {
            let mut scratch = self.stage(&head, &mut body).await?;

            let (aspect_ratio, probe_error) = if policy.probe_aspect_ratio {
                match self.probe.probe_aspect_ratio(&scratch.path).await {
                    Ok(ratio) => (Some(ratio), None),
                    Err(e) => {
                        tracing::warn!(error = %e, "Media probe failed, continuing without aspect ratio");
                        (None, Some(e.to_string()))
                    }
                }
            } else {
                (None, None)
            };

            let key = StorageKey::generate(&content_type);
            let stored = self.commit(&key, &content_type, &mut scratch.file).await?;
            (stored, aspect_ratio, probe_error)
        } else {
            let key = StorageKey::generate(&content_type);
            let mut source = Cursor::new(head).chain(&mut body);
            let result = self.storage.put(&key, &content_type, &mut source).await;

            match result {
                Ok(stored) => (stored, None, None),
                Err(_) if body.is_exceeded() => return Err(IngestError::PayloadTooLarge { limit }),
                Err(source) => match body.source_error() {
                    Some(e) => return Err(IngestError::Read(e)),
                    None => return Err(IngestError::StorageCommit { key, source }),
                },
            }
        };

        let url = self.storage.url_for(&stored.key);

        tracing::info!(
            key = %stored.key,
            url = %url,
            content_type = %stored.content_type,
            size_bytes = stored.size_bytes,
            aspect_ratio = ?aspect_ratio,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload ingested"
        );

        Ok(IngestOutcome {
            key: stored.key,
            url,
            content_type: stored.content_type,
            size_bytes: stored.size_bytes,
            aspect_ratio,
            probe_error,
        })
    }

    /// Copy the whole body into a fresh scratch file, rewound to its start.
    async fn stage<R>(
        &self,
        head: &[u8],
        body: &mut SizeLimitedReader<R>,
    ) -> Result<ScratchFile, IngestError>
    where
        R: AsyncRead + Send + Unpin,
    {
        let (std_file, path) = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempfile_in(&self.scratch_dir)
            .map_err(IngestError::Staging)?
            .into_parts();
        let mut scratch = ScratchFile {
            file: File::from_std(std_file),
            path,
        };

        scratch
            .file
            .write_all(head)
            .await
            .map_err(IngestError::Staging)?;

        let mut buf = vec![0u8; COPY_BUF_SIZE];
        loop {
            let n = body.read(&mut buf).await.map_err(|e| read_failure(body, e))?;
            if n == 0 {
                break;
            }
            scratch
                .file
                .write_all(&buf[..n])
                .await
                .map_err(IngestError::Staging)?;
        }

        scratch.file.flush().await.map_err(IngestError::Staging)?;
        scratch.file.rewind().await.map_err(IngestError::Staging)?;

        tracing::debug!(
            path = %scratch.path.display(),
            size_bytes = body.consumed(),
            "Upload staged"
        );

        Ok(scratch)
    }

    async fn commit(
        &self,
        key: &StorageKey,
        content_type: &str,
        source: &mut File,
    ) -> Result<StoredObject, IngestError> {
        self.storage
            .put(key, content_type, source)
            .await
            .map_err(|source| IngestError::StorageCommit {
                key: key.clone(),
                source,
            })
    }
}

/// Read up to [`SNIFF_LEN`] leading bytes; shorter only at end of input.
async fn read_head<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    head.truncate(filled);
    Ok(head)
}

fn read_failure<R>(body: &SizeLimitedReader<R>, err: io::Error) -> IngestError {
    if body.is_exceeded() {
        IngestError::PayloadTooLarge {
            limit: body.limit(),
        }
    } else {
        IngestError::Read(err)
    }
}
