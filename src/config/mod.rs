//! Configuration management for stockbridge
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use stockbridge::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any setting can be overridden with `STOCKBRIDGE__<section>__<key>`:
//! - `STOCKBRIDGE__SERVER__BIND_ADDR=127.0.0.1:9000`
//! - `STOCKBRIDGE__BRIDGE__MOCK_DIR=fixtures/mock`
//! - `STOCKBRIDGE__SERVER__MAX_UPLOAD_BYTES=10MB`
//!
//! Upstream API keys are read only from `APIKEY_UNSPLASH`, `APIKEY_PIXABAY`,
//! `APIKEY_PEXELS` and `APIKEY_FLICKR` (a `.env` file is honoured).
//!
//! # Configuration File
//!
//! The file is read from `config/stockbridge.toml` unless
//! `STOCKBRIDGE_CONFIG` points elsewhere. It is optional.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    ApiKeys, BridgeConfig, Config, ImageConfig, ServerConfig, ServiceOverride, UploadConfig,
};
pub use validation::ValidationError;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or a value
    /// fails validation (unknown service override, zero timeouts, ...).
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, skipping `.env` and secrets
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

impl BridgeConfig {
    pub fn max_stale(&self) -> Duration {
        Duration::from_secs(self.max_stale_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
