//! Application state shared by every handler.

use std::sync::Arc;

use tubely_core::Config;
use tubely_db::VideoStore;
use tubely_processing::{IngestPolicy, IngestionPipeline, MediaProbe};
use tubely_storage::Storage;

use crate::auth::JwtKeys;

pub struct AppState {
    pub config: Config,
    pub videos: Arc<dyn VideoStore>,
    pub storage: Arc<dyn Storage>,
    pub pipeline: IngestionPipeline,
    pub jwt: JwtKeys,
    pub thumbnail_policy: IngestPolicy,
    pub video_policy: IngestPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        videos: Arc<dyn VideoStore>,
        storage: Arc<dyn Storage>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        let pipeline = IngestionPipeline::new(storage.clone(), probe, config.scratch_dir.clone());
        let thumbnail_policy = IngestPolicy::thumbnail(
            config.max_thumbnail_size_bytes,
            config.thumbnail_allowed_content_types.clone(),
        );
        let video_policy = IngestPolicy::video(config.max_video_size_bytes);
        let jwt = JwtKeys::new(&config.jwt_secret);

        Self {
            config,
            videos,
            storage,
            pipeline,
            jwt,
            thumbnail_policy,
            video_policy,
        }
    }
}
