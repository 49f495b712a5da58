//! Shared steps of the upload handlers: owner lookup, multipart-to-pipeline
//! plumbing and the record update with its compensating delete.

use std::io;
use std::sync::Arc;

use axum::extract::Multipart;
use axum::http::{header::CONTENT_LENGTH, HeaderMap};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tubely_core::{AppError, Video};
use tubely_db::VideoUpdate;
use tubely_processing::{IngestOutcome, IngestPolicy, UploadRequest};
use tubely_storage::StorageKey;
use uuid::Uuid;

use crate::constants::MULTIPART_OVERHEAD_BYTES;
use crate::state::AppState;

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput(format!("Invalid video ID: {}", raw)))
}

/// Fetch a video the caller owns: 404 when unknown, 403 when someone else's.
pub(crate) async fn load_owned_video(
    state: &AppState,
    video_id: Uuid,
    user_id: Uuid,
) -> Result<Video, AppError> {
    let video = state
        .videos
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    if !video.is_owned_by(user_id) {
        tracing::warn!(video_id = %video_id, user_id = %user_id, "Upload attempted by non-owner");
        return Err(AppError::Forbidden(
            "You do not have permission to modify this video".to_string(),
        ));
    }

    Ok(video)
}

/// Upper bound on the file part implied by the request's `Content-Length`.
pub(crate) fn declared_file_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|len| len.saturating_sub(MULTIPART_OVERHEAD_BYTES))
}

/// Stream the multipart field named `field_name` through the ingestion pipeline.
///
/// Fields before it are skipped unread; a missing field is a client error.
pub(crate) async fn ingest_file_field(
    state: &AppState,
    multipart: &mut Multipart,
    field_name: &str,
    owner_id: Uuid,
    video_id: Uuid,
    declared_size: Option<u64>,
    policy: &IngestPolicy,
) -> Result<IngestOutcome, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));

        let mut request = UploadRequest::new(body, owner_id, video_id);
        if let Some(content_type) = content_type {
            request = request.with_content_type(content_type);
        }
        if let Some(size) = declared_size {
            request = request.with_declared_size(size);
        }

        return Ok(state.pipeline.ingest(request, policy).await?);
    }

    Err(AppError::InvalidInput(format!(
        "Missing multipart field '{}'",
        field_name
    )))
}

/// Write the upload's columns; if that fails, delete the object just committed.
pub(crate) async fn save_or_discard(
    state: &AppState,
    video_id: Uuid,
    update: &VideoUpdate,
    key: &StorageKey,
) -> Result<Video, AppError> {
    match state.videos.update_video(video_id, update).await {
        Ok(saved) => Ok(saved),
        Err(e) => {
            let storage = Arc::clone(&state.storage);
            let key = key.clone();
            tokio::spawn(async move {
                match storage.delete(&key).await {
                    Ok(()) => tracing::info!(key = %key, "Removed object orphaned by failed update"),
                    Err(err) => tracing::error!(
                        key = %key,
                        error = %err,
                        "Failed to remove object orphaned by failed update"
                    ),
                }
            });
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_video_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_video_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_video_id("not-a-uuid"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_declared_file_size() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_file_size(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1000"));
        assert_eq!(declared_file_size(&headers), Some(0));

        let len = MULTIPART_OVERHEAD_BYTES + 5000;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        assert_eq!(declared_file_size(&headers), Some(5000));
    }
}
