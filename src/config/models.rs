use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub images: ImageConfig,
    /// Per-service overrides keyed by service name (`unsplash`, `pexels`, ...)
    #[serde(default)]
    pub services: HashMap<String, ServiceOverride>,
    /// Upstream API keys (loaded from environment, never from the config file)
    #[serde(skip)]
    pub api_keys: ApiKeys,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Request body limit, applied to multipart uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9008))
}

fn default_max_upload_bytes() -> ByteSize {
    ByteSize::mib(5)
}

/// API bridge configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Directory holding `{service}-{fingerprint}.json` replay records
    #[serde(default = "default_mock_dir")]
    pub mock_dir: PathBuf,
    /// Fjall keyspace backing the upstream response cache
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Value of the `max-stale` directive sent with every upstream request
    #[serde(default = "default_max_stale_secs")]
    pub max_stale_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mock_dir: default_mock_dir(),
            cache_path: default_cache_path(),
            max_stale_secs: default_max_stale_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_mock_dir() -> PathBuf {
    PathBuf::from("mock")
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("cache/responses")
}

fn default_max_stale_secs() -> u64 {
    3600
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("stockbridge/{}", env!("CARGO_PKG_VERSION"))
}

/// Upload storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    /// Public URL prefix under which uploaded files are served
    #[serde(default = "default_upload_url_prefix")]
    pub url_prefix: String,
    /// Maximum number of `files[]` parts in one upload request
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            url_prefix: default_upload_url_prefix(),
            max_files: default_max_files(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_upload_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_files() -> usize {
    20
}

/// Image transform configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Directory that `src` paths are resolved against
    #[serde(default = "default_image_root")]
    pub root: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            root: default_image_root(),
        }
    }
}

fn default_image_root() -> PathBuf {
    PathBuf::from(".")
}

/// Optional per-service settings from the config file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceOverride {
    pub base_url: Option<String>,
}

/// Upstream secrets, one per keyed provider
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub unsplash: Option<String>,
    pub pixabay: Option<String>,
    pub pexels: Option<String>,
    pub flickr: Option<String>,
}
