//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs in-process: local storage in a temp dir, an in-memory video
//! store and a probe with a fixed answer, so no database or ffprobe is needed.

pub mod auth;
pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tubely_api::setup::routes;
use tubely_api::state::AppState;
use tubely_core::{AppError, AspectRatio, Config, StorageBackend, Video};
use tubely_db::{InMemoryVideoStore, VideoStore, VideoUpdate};
use tubely_processing::{MediaProbe, ProbeError};
use tubely_storage::{
    LocalStorage, Storage, StorageError, StorageKey, StorageResult, StoredObject,
};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// Probe with a fixed answer; `None` simulates a probe failure.
pub struct FakeProbe {
    ratio: Option<AspectRatio>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(ratio: Option<AspectRatio>) -> Arc<Self> {
        Arc::new(Self {
            ratio,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProbe for FakeProbe {
    async fn probe_aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "probe must see the staged file");
        self.ratio.ok_or(ProbeError::MissingDimensions)
    }
}

/// Video store whose updates always fail, to exercise the compensating delete.
pub struct FailingUpdateStore {
    pub inner: InMemoryVideoStore,
}

#[async_trait]
impl VideoStore for FailingUpdateStore {
    async fn create_video(&self, video: &Video) -> Result<Video, AppError> {
        self.inner.create_video(video).await
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        self.inner.get_video(id).await
    }

    async fn update_video(&self, _id: Uuid, _update: &VideoUpdate) -> Result<Video, AppError> {
        Err(AppError::Internal("connection reset".to_string()))
    }
}

/// Video store that counts record updates.
pub struct CountingStore {
    pub inner: InMemoryVideoStore,
    pub updates: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryVideoStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            updates: AtomicUsize::new(0),
        })
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoStore for CountingStore {
    async fn create_video(&self, video: &Video) -> Result<Video, AppError> {
        self.inner.create_video(video).await
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        self.inner.get_video(id).await
    }

    async fn update_video(&self, id: Uuid, update: &VideoUpdate) -> Result<Video, AppError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_video(id, update).await
    }
}

/// Remote-style backend whose PUT is refused after the body has been read.
pub struct RejectingRemoteStorage {
    pub puts: AtomicUsize,
}

impl RejectingRemoteStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            puts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Storage for RejectingRemoteStorage {
    async fn put(
        &self,
        _key: &StorageKey,
        _content_type: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<StoredObject> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        reader
            .read_to_end(&mut sink)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Err(StorageError::UploadFailed("AccessDenied".to_string()))
    }

    fn url_for(&self, key: &StorageKey) -> String {
        format!("https://tubely-media.s3.us-east-2.amazonaws.com/{}", key)
    }

    async fn delete(&self, _key: &StorageKey) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &StorageKey) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    fn requires_seekable_source(&self) -> bool {
        true
    }
}

/// Test application: server plus owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub videos: InMemoryVideoStore,
    pub probe: Arc<FakeProbe>,
    pub assets: TempDir,
    pub scratch: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Seed a draft video owned by `user_id`.
    pub async fn seed_video(&self, user_id: Uuid) -> Video {
        let video = Video::new(user_id, "Boots video", Some("A video about boots".to_string()));
        self.videos.add_video(video.clone()).await;
        video
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        auth::token_for(&self.state, user_id)
    }

    pub fn asset_count(&self) -> usize {
        count_entries(self.assets.path())
    }

    pub fn scratch_count(&self) -> usize {
        count_entries(self.scratch.path())
    }
}

pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn test_config(assets: &Path, scratch: &Path) -> Config {
    let vars: HashMap<String, String> = [
        ("JWT_SECRET", TEST_JWT_SECRET),
        ("PORT", "8091"),
        ("STORAGE_BACKEND", "local"),
        ("MAX_THUMBNAIL_SIZE_MB", "1"),
        ("MAX_VIDEO_SIZE_MB", "2"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .chain([
        ("ASSETS_ROOT".to_string(), assets.display().to_string()),
        ("SCRATCH_DIR".to_string(), scratch.display().to_string()),
    ])
    .collect();

    let config = Config::from_map(&vars).expect("valid test config");
    config.validate().expect("test config passes validation");
    config
}

/// App with an in-memory store and a probe answering `ratio`.
pub async fn setup_test_app(ratio: Option<AspectRatio>) -> TestApp {
    let videos = InMemoryVideoStore::new();
    setup_test_app_with_store(videos.clone(), Arc::new(videos), ratio).await
}

/// App whose handlers use `store`; `videos` is the backing store used for seeding.
pub async fn setup_test_app_with_store(
    videos: InMemoryVideoStore,
    store: Arc<dyn VideoStore>,
    ratio: Option<AspectRatio>,
) -> TestApp {
    setup_test_app_with(videos, store, None, ratio).await
}

/// As [`setup_test_app_with_store`], with `storage` replacing local disk when given.
pub async fn setup_test_app_with(
    videos: InMemoryVideoStore,
    store: Arc<dyn VideoStore>,
    storage: Option<Arc<dyn Storage>>,
    ratio: Option<AspectRatio>,
) -> TestApp {
    let assets = tempfile::tempdir().expect("Failed to create assets dir");
    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let config = test_config(assets.path(), scratch.path());

    let storage: Arc<dyn Storage> = match storage {
        Some(storage) => storage,
        None => Arc::new(
            LocalStorage::new(assets.path(), config.storage.local_base_url.clone())
                .await
                .expect("Failed to create local storage"),
        ),
    };
    let probe = FakeProbe::new(ratio);

    let state = Arc::new(AppState::new(config.clone(), store, storage, probe.clone()));
    let router = routes::setup_routes(&config, state.clone());
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        videos,
        probe,
        assets,
        scratch,
    }
}
