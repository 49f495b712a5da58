use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tubely_core::models::VideoUploadResponse;
use tubely_db::VideoUpdate;

use super::upload::{
    declared_file_size, ingest_file_field, load_owned_video, parse_video_id, save_or_discard,
};
use crate::auth::AuthenticatedUser;
use crate::constants::VIDEO_FIELD;
use crate::error::HttpAppError;
use crate::state::AppState;

/// `POST /api/video_upload/{videoID}`: store an MP4, classify its aspect ratio and
/// record both on the video.
///
/// A failed probe does not fail the upload; the record keeps no aspect ratio.
#[tracing::instrument(skip(state, headers, multipart), fields(user_id = %user.user_id))]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<VideoUploadResponse>), HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    load_owned_video(&state, video_id, user.user_id).await?;

    let outcome = ingest_file_field(
        &state,
        &mut multipart,
        VIDEO_FIELD,
        user.user_id,
        video_id,
        declared_file_size(&headers),
        &state.video_policy,
    )
    .await?;

    if let Some(ref reason) = outcome.probe_error {
        tracing::warn!(video_id = %video_id, reason = %reason, "Stored video without aspect ratio");
    }

    let update = VideoUpdate::Media {
        url: outcome.url.clone(),
        aspect_ratio: outcome.aspect_ratio,
    };
    let video = save_or_discard(&state, video_id, &update, &outcome.key).await?;

    tracing::info!(
        video_id = %video.id,
        key = %outcome.key,
        size_bytes = outcome.size_bytes,
        aspect_ratio = ?video.aspect_ratio,
        "Video uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(VideoUploadResponse {
            id: video.id,
            video_url: outcome.url,
            aspect_ratio: video.aspect_ratio,
        }),
    ))
}
