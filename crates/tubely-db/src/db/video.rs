use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tubely_core::{AppError, AspectRatio, Video};
use uuid::Uuid;

/// Video metadata access used by the upload handlers.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create_video(&self, video: &Video) -> Result<Video, AppError>;

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError>;

    /// Write the columns named by `update`, leave every other column as stored and
    /// bump `updated_at`.
    ///
    /// Returns `AppError::NotFound` when the record no longer exists.
    async fn update_video(&self, id: Uuid, update: &VideoUpdate) -> Result<Video, AppError>;
}

/// Columns set by a completed upload.
///
/// Thumbnail and video uploads to the same record can overlap, so each variant
/// only writes its own columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoUpdate {
    Thumbnail {
        url: String,
    },
    Media {
        url: String,
        aspect_ratio: Option<AspectRatio>,
    },
}

impl VideoUpdate {
    /// Apply to an in-memory copy of the record.
    pub fn apply(&self, video: &mut Video) {
        match self {
            VideoUpdate::Thumbnail { url } => video.thumbnail_url = Some(url.clone()),
            VideoUpdate::Media { url, aspect_ratio } => {
                video.video_url = Some(url.clone());
                video.aspect_ratio = *aspect_ratio;
            }
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    title: String,
    description: Option<String>,
    user_id: Uuid,
    thumbnail_url: Option<String>,
    video_url: Option<String>,
    aspect_ratio: Option<String>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        let aspect_ratio = row.aspect_ratio.as_deref().and_then(|s| {
            s.parse::<AspectRatio>()
                .map_err(|e| {
                    tracing::warn!(video_id = %row.id, error = %e, "Ignoring unknown aspect ratio");
                })
                .ok()
        });

        Video {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            title: row.title,
            description: row.description,
            user_id: row.user_id,
            thumbnail_url: row.thumbnail_url,
            video_url: row.video_url,
            aspect_ratio,
        }
    }
}

const VIDEO_COLUMNS: &str =
    "id, created_at, updated_at, title, description, user_id, thumbnail_url, video_url, aspect_ratio";

/// Postgres-backed video repository
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    #[tracing::instrument(skip(self, video), fields(video_id = %video.id))]
    async fn create_video(&self, video: &Video) -> Result<Video, AppError> {
        let row = sqlx::query_as::<Postgres, VideoRow>(&format!(
            r#"
            INSERT INTO videos (id, created_at, updated_at, title, description, user_id,
                                thumbnail_url, video_url, aspect_ratio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        ))
        .bind(video.id)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.user_id)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.aspect_ratio.map(|r| r.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        let row = sqlx::query_as::<Postgres, VideoRow>(&format!(
            "SELECT {} FROM videos WHERE id = $1",
            VIDEO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Video::from))
    }

    #[tracing::instrument(skip(self, update), fields(video_id = %id))]
    async fn update_video(&self, id: Uuid, update: &VideoUpdate) -> Result<Video, AppError> {
        let (set_clause, url, aspect_ratio) = match update {
            VideoUpdate::Thumbnail { url } => ("thumbnail_url = $2", url, None),
            VideoUpdate::Media { url, aspect_ratio } => (
                "video_url = $2, aspect_ratio = $3",
                url,
                Some(aspect_ratio.map(|r| r.as_str())),
            ),
        };
        let sql = format!(
            "UPDATE videos SET {}, updated_at = NOW() WHERE id = $1 RETURNING {}",
            set_clause, VIDEO_COLUMNS
        );

        let mut query = sqlx::query_as::<Postgres, VideoRow>(&sql).bind(id).bind(url);
        if let Some(aspect_ratio) = aspect_ratio {
            query = query.bind(aspect_ratio);
        }

        let row = query.fetch_optional(&self.pool).await?;

        row.map(Video::from)
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))
    }
}
