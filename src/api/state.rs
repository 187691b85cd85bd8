use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::bridge::{Bridge, ClientConfig, MockStore, ServiceRegistry, UpstreamClient, UpstreamError};
use crate::cache::{CacheError, FjallCache, ResponseCache};
use crate::config::Config;
use crate::imaging::{ImageCrateProcessor, ImageProcessor};
use crate::observability::Metrics;
use crate::uploads::{UploadError, UploadStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open response cache: {0}")]
    Cache(#[from] CacheError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] UpstreamError),

    #[error("failed to open upload store: {0}")]
    Uploads(#[from] UploadError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bridge: Arc<Bridge>,
    pub uploads: UploadStore,
    pub images: Arc<dyn ImageProcessor>,
    pub cache: Arc<dyn ResponseCache>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        cache: Arc<dyn ResponseCache>,
        uploads: UploadStore,
        images: Arc<dyn ImageProcessor>,
    ) -> Result<Self, StartupError> {
        let registry = ServiceRegistry::from_config(&config);
        let client = UpstreamClient::new(ClientConfig::from(&config.bridge), cache.clone())?;
        let mocks = MockStore::new(&config.bridge.mock_dir);
        let bridge = Bridge::new(registry, mocks, client, config.bridge.max_stale());

        Ok(Self {
            config: Arc::new(config),
            bridge: Arc::new(bridge),
            uploads,
            images,
            cache,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Open every on-disk store named in `config`
    pub async fn from_config(config: Config) -> Result<Self, StartupError> {
        let cache = FjallCache::open(&config.bridge.cache_path)?;

        info!(path = %config.uploads.dir.display(), "Opening upload store");
        let uploads = UploadStore::local(&config.uploads.dir)?;

        let state = Self::new(config, Arc::new(cache), uploads, Arc::new(ImageCrateProcessor))?;

        // Missing mock dir only disables recording
        if let Err(err) = state.bridge.mocks().ensure_dir().await {
            warn!(
                path = %state.bridge.mocks().dir().display(),
                error = %err,
                "Cannot create mock directory, responses will not be recorded"
            );
        }

        Ok(state)
    }
}
