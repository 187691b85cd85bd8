//! HTTP client for upstream calls, fronted by the shared response cache

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode, header};
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

use super::headers::{from_pairs, scrub_cache_headers, to_pairs};
use crate::cache::{CachedResponse, ResponseCache};
use crate::config::BridgeConfig;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("upstream {url} answered {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Client settings, derived from `[bridge]`
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("stockbridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&BridgeConfig> for ClientConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Response handed back to the bridge, cache-invalidating headers removed
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Served from the shared cache without touching the network
    pub from_cache: bool,
}

/// Upstream HTTP client with a stale-tolerant shared cache
pub struct UpstreamClient {
    client: Client,
    cache: Arc<dyn ResponseCache>,
    config: ClientConfig,
}

impl UpstreamClient {
    pub fn new(config: ClientConfig, cache: Arc<dyn ResponseCache>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| UpstreamError::Build(e.to_string()))?;

        Ok(Self {
            client,
            cache,
            config,
        })
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    /// GET `url`, honouring a `max-stale` directive found in `headers`
    ///
    /// Without `max-stale` the cache is bypassed for reads but successful
    /// responses are still stored.
    pub async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<UpstreamResponse> {
        if let Some(max_stale) = max_stale(headers) {
            if let Some(hit) = self.lookup(url, max_stale) {
                return Ok(hit);
            }
        }

        let mut response = self.fetch(url, headers).await?;
        scrub_cache_headers(&mut response.headers);
        self.store(url, &response);

        Ok(response)
    }

    fn lookup(&self, url: &Url, max_stale: Duration) -> Option<UpstreamResponse> {
        let cached = match self.cache.get("GET", url.as_str()) {
            Ok(cached) => cached?,
            Err(err) => {
                warn!(url = %url, error = %err, "Response cache read failed, treating as miss");
                return None;
            }
        };

        let now = Utc::now();
        if !cached.is_usable(max_stale, now) {
            debug!(url = %url, age = ?cached.age(now), "Cached response too stale");
            return None;
        }

        let status = StatusCode::from_u16(cached.status).ok()?;
        debug!(url = %url, age = ?cached.age(now), "Serving upstream response from cache");

        Some(UpstreamResponse {
            status,
            headers: from_pairs(&cached.headers),
            body: Bytes::from(cached.body),
            from_cache: true,
        })
    }

    fn store(&self, url: &Url, response: &UpstreamResponse) {
        let Ok(body) = std::str::from_utf8(&response.body) else {
            debug!(url = %url, "Not caching non-UTF-8 body");
            return;
        };

        let entry = CachedResponse {
            status: response.status.as_u16(),
            headers: to_pairs(&response.headers),
            body: body.to_string(),
            stored_at: Utc::now(),
        };

        if let Err(err) = self.cache.set("GET", url.as_str(), &entry) {
            warn!(url = %url, error = %err, "Response cache write failed");
        }
    }

    /// Single network round trip, no retry
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<UpstreamResponse> {
        debug!(url = %url, "Calling upstream");

        let response = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.config.request_timeout)
                } else {
                    UpstreamError::RequestFailed(format!("{}: {}", redact(url), e.without_url()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: redact(url),
                status,
            });
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.config.request_timeout)
            } else {
                UpstreamError::RequestFailed(format!(
                    "Failed to read body from {}: {}",
                    redact(url),
                    e.without_url()
                ))
            }
        })?;

        debug!(url = %url, status = status.as_u16(), size = body.len(), "Upstream answered");

        Ok(UpstreamResponse {
            status,
            headers,
            body,
            from_cache: false,
        })
    }
}

/// Parse `max-stale=N` out of a request's Cache-Control header
///
/// A bare `max-stale` (no value) accepts any age.
pub fn max_stale(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find_map(|directive| {
            let (name, value) = directive
                .split_once('=')
                .map_or((directive, None), |(n, v)| (n.trim(), Some(v.trim())));
            if !name.eq_ignore_ascii_case("max-stale") {
                return None;
            }
            match value {
                None => Some(Duration::MAX),
                Some(secs) => secs.trim_matches('"').parse().ok().map(Duration::from_secs),
            }
        })
}

/// URL without its query string, for error messages that may reach clients
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
