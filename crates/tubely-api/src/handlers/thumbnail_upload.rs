use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use tubely_core::Video;
use tubely_db::VideoUpdate;

use super::upload::{
    declared_file_size, ingest_file_field, load_owned_video, parse_video_id, save_or_discard,
};
use crate::auth::AuthenticatedUser;
use crate::constants::THUMBNAIL_FIELD;
use crate::error::HttpAppError;
use crate::state::AppState;

/// `POST /api/thumbnail_upload/{videoID}`: store a thumbnail image and point the
/// video at it.
#[tracing::instrument(skip(state, headers, multipart), fields(user_id = %user.user_id))]
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    load_owned_video(&state, video_id, user.user_id).await?;

    let outcome = ingest_file_field(
        &state,
        &mut multipart,
        THUMBNAIL_FIELD,
        user.user_id,
        video_id,
        declared_file_size(&headers),
        &state.thumbnail_policy,
    )
    .await?;

    let update = VideoUpdate::Thumbnail {
        url: outcome.url.clone(),
    };
    let video = save_or_discard(&state, video_id, &update, &outcome.key).await?;

    tracing::info!(
        video_id = %video.id,
        key = %outcome.key,
        size_bytes = outcome.size_bytes,
        "Thumbnail uploaded"
    );

    Ok(Json(video))
}
