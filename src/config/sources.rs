use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "STOCKBRIDGE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/stockbridge.toml";
const ENV_PREFIX: &str = "STOCKBRIDGE";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // A missing .env is the normal case outside development
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = load_from_sources(config_path)?;
    load_secrets(&mut config);

    Ok(config)
}

/// Upstream API keys live only in the environment
fn load_secrets(config: &mut Config) {
    let read = |name: &str| env::var(name).ok().filter(|value| !value.is_empty());

    config.api_keys.unsplash = read("APIKEY_UNSPLASH");
    config.api_keys.pixabay = read("APIKEY_PIXABAY");
    config.api_keys.pexels = read("APIKEY_PEXELS");
    config.api_keys.flickr = read("APIKEY_FLICKR");

    for (service, key) in [
        ("unsplash", &config.api_keys.unsplash),
        ("pixabay", &config.api_keys.pixabay),
        ("pexels", &config.api_keys.pexels),
        ("flickr", &config.api_keys.flickr),
    ] {
        if key.is_none() {
            tracing::warn!(service, "No API key configured; upstream calls will likely be rejected");
        }
    }
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // STOCKBRIDGE__BRIDGE__MOCK_DIR -> bridge.mock_dir
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:9008");
        assert_eq!(config.bridge.max_stale_secs, 3600);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[server]
bind_addr = "127.0.0.1:9100"
max_upload_bytes = "10MB"

[bridge]
mock_dir = "replay"
max_stale_secs = 60

[uploads]
dir = "public/uploads"
max_files = 5

[services.unsplash]
base_url = "http://localhost:3000/"
            "#,
        )
        .unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9100");
        assert_eq!(config.server.max_upload_bytes.as_u64(), 10 * 1024 * 1024);
        assert_eq!(config.bridge.mock_dir, PathBuf::from("replay"));
        assert_eq!(config.bridge.max_stale_secs, 60);
        assert_eq!(config.uploads.max_files, 5);
        assert_eq!(
            config.services["unsplash"].base_url.as_deref(),
            Some("http://localhost:3000/")
        );
    }

    #[test]
    fn test_api_keys_are_not_read_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[api_keys]
unsplash = "leaked"
            "#,
        )
        .unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert!(config.api_keys.unsplash.is_none());
    }
}
