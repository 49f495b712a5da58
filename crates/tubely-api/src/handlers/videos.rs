use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tubely_core::{AppError, Video};

use super::upload::{load_owned_video, parse_video_id};
use crate::auth::AuthenticatedUser;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST /api/videos`: create an empty draft owned by the caller.
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    body: Result<Json<CreateVideoRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<(StatusCode, Json<Video>), HttpAppError> {
    let Json(body) = body?;

    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title must not be empty".to_string()).into());
    }

    let video = Video::new(user.user_id, title, body.description);
    let video = state.videos.create_video(&video).await?;

    tracing::info!(video_id = %video.id, user_id = %user.user_id, "Video draft created");

    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos/{videoID}`
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = load_owned_video(&state, video_id, user.user_id).await?;
    Ok(Json(video))
}
