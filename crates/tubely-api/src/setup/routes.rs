//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tubely_core::{Config, StorageBackend};
use tubely_infra::{get_request_id, request_id_middleware};

use crate::constants::{ASSETS_PATH, MULTIPART_OVERHEAD_BYTES};
use crate::handlers::{health, thumbnail_upload, video_upload, videos};
use crate::state::AppState;

fn body_limit(file_limit: u64) -> DefaultBodyLimit {
    let total = file_limit.saturating_add(MULTIPART_OVERHEAD_BYTES);
    DefaultBodyLimit::max(usize::try_from(total).unwrap_or(usize::MAX))
}

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/videos", post(videos::create_video))
        .route("/api/videos/{video_id}", get(videos::get_video))
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(thumbnail_upload::upload_thumbnail)
                .layer(body_limit(config.max_thumbnail_size_bytes)),
        )
        .route(
            "/api/video_upload/{video_id}",
            post(video_upload::upload_video).layer(body_limit(config.max_video_size_bytes)),
        )
        .with_state(state);

    let mut app = Router::new()
        .route("/health", get(health::liveness_check))
        .merge(api_routes);

    if config.storage.backend == StorageBackend::Local {
        tracing::info!(
            root = %config.storage.assets_root.display(),
            mount = ASSETS_PATH,
            "Serving local assets"
        );
        app = app.nest_service(ASSETS_PATH, ServeDir::new(&config.storage.assets_root));
    }

    // request ids are assigned outermost so the trace span can carry them
    app.layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %get_request_id(request).unwrap_or_default(),
                )
            }),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
}
