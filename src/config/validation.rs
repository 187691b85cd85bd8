use super::models::Config;
use crate::bridge::ServiceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Unknown service '{name}' in [services]; expected one of: {expected}")]
    UnknownService { name: String, expected: String },

    #[error("Service '{service}' base_url must be an absolute http(s) URL, got '{url}'")]
    InvalidBaseUrl { service: String, url: String },

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("uploads.max_files must be between 1 and {limit}, got {actual}")]
    MaxFilesOutOfRange { actual: usize, limit: usize },

    #[error("uploads.url_prefix must start with '/', got '{0}'")]
    InvalidUrlPrefix(String),

    #[error("server.max_upload_bytes must be positive")]
    ZeroUploadLimit,
}

const MAX_FILES_LIMIT: usize = 100;

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_services(config)?;
    validate_bridge(config)?;
    validate_uploads(config)?;
    Ok(())
}

/// Overrides must name a known service and point at an http(s) URL
fn validate_services(config: &Config) -> Result<(), ValidationError> {
    for (name, service) in &config.services {
        if name.parse::<ServiceKind>().is_err() {
            return Err(ValidationError::UnknownService {
                name: name.clone(),
                expected: ServiceKind::ALL
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        if let Some(url) = &service.base_url {
            if reqwest::Url::parse(url)
                .map(|parsed| !matches!(parsed.scheme(), "http" | "https"))
                .unwrap_or(true)
            {
                return Err(ValidationError::InvalidBaseUrl {
                    service: name.clone(),
                    url: url.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_bridge(config: &Config) -> Result<(), ValidationError> {
    let bridge = &config.bridge;

    if bridge.max_stale_secs == 0 {
        return Err(ValidationError::NonPositive {
            field: "bridge.max_stale_secs",
        });
    }
    if bridge.connect_timeout_secs == 0 {
        return Err(ValidationError::NonPositive {
            field: "bridge.connect_timeout_secs",
        });
    }
    if bridge.request_timeout_secs == 0 {
        return Err(ValidationError::NonPositive {
            field: "bridge.request_timeout_secs",
        });
    }

    Ok(())
}

fn validate_uploads(config: &Config) -> Result<(), ValidationError> {
    let uploads = &config.uploads;

    if !(1..=MAX_FILES_LIMIT).contains(&uploads.max_files) {
        return Err(ValidationError::MaxFilesOutOfRange {
            actual: uploads.max_files,
            limit: MAX_FILES_LIMIT,
        });
    }

    if !uploads.url_prefix.starts_with('/') {
        return Err(ValidationError::InvalidUrlPrefix(uploads.url_prefix.clone()));
    }

    if config.server.max_upload_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroUploadLimit);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::models::*;
    use super::*;
    use crate::humanize::ByteSize;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_unknown_service_override() {
        let mut config = Config::default();
        config
            .services
            .insert("shutterstock".to_string(), ServiceOverride::default());

        let result = validate(&config);
        assert!(matches!(
            result,
            Err(ValidationError::UnknownService { ref name, .. }) if name == "shutterstock"
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.services.insert(
            "pixabay".to_string(),
            ServiceOverride {
                base_url: Some("ftp://pixabay.example/api/".to_string()),
            },
        );

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidBaseUrl { .. })));

        config.services.get_mut("pixabay").unwrap().base_url = Some("not a url".to_string());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_zero_max_stale() {
        let mut config = Config::default();
        config.bridge.max_stale_secs = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::NonPositive {
                field: "bridge.max_stale_secs"
            })
        ));
    }

    #[test]
    fn test_upload_limits() {
        let mut config = Config::default();
        config.uploads.max_files = 0;
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MaxFilesOutOfRange { actual: 0, .. })
        ));

        let mut config = Config::default();
        config.uploads.url_prefix = "uploads".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidUrlPrefix(_))
        ));

        let mut config = Config::default();
        config.server.max_upload_bytes = ByteSize(0);
        assert!(matches!(validate(&config), Err(ValidationError::ZeroUploadLimit)));
    }
}
