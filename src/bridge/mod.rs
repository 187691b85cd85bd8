//! Cached, replayable proxy to the stock-photo APIs
//!
//! A bridge request names a service, an upstream path and a query. The
//! request is answered, in order of preference, from:
//!
//! 1. a mock record in the mock directory (`x-mocked: true`, no network),
//! 2. the shared response cache inside [`UpstreamClient`] (`x-cached: true`),
//! 3. the upstream itself.
//!
//! Every live JSON answer is written back as a mock record, so repeating a
//! request replays it offline from then on.

mod client;
mod error;
mod fingerprint;
pub mod headers;
mod mock;
mod services;

pub use client::{ClientConfig, UpstreamClient, UpstreamError, UpstreamResponse, max_stale};
pub use error::{BridgeError, Result};
pub use fingerprint::{Fingerprint, canonical_query};
pub use mock::{MockError, MockRecord, MockStore};
pub use services::{Credential, ServiceDescriptor, ServiceKind, ServiceRegistry, UnknownService};

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Inbound request, as captured from `/bridge/{service}/{*path}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub service: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOrigin {
    Mock,
    Upstream { from_cache: bool },
}

#[derive(Debug, Clone)]
pub struct BridgeResponse {
    /// `x-*` headers to forward to the caller
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub origin: ResponseOrigin,
}

pub struct Bridge {
    registry: ServiceRegistry,
    mocks: MockStore,
    client: UpstreamClient,
    max_stale: Duration,
}

impl Bridge {
    pub fn new(
        registry: ServiceRegistry,
        mocks: MockStore,
        client: UpstreamClient,
        max_stale: Duration,
    ) -> Self {
        Self {
            registry,
            mocks,
            client,
            max_stale,
        }
    }

    pub fn mocks(&self) -> &MockStore {
        &self.mocks
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub async fn handle(&self, request: &BridgeRequest) -> Result<BridgeResponse> {
        let service = request.service.as_str();
        let descriptor = self
            .registry
            .get(service)
            .ok_or_else(|| BridgeError::UnknownService(service.to_string()))?;

        let fingerprint = Fingerprint::of(&request.path, &request.query);

        match self.mocks.load(service, &fingerprint).await {
            Ok(Some(record)) => {
                info!(service, %fingerprint, "Replaying mock record");
                return Ok(BridgeResponse {
                    headers: headers::retain_propagated(record.headers),
                    body: record.body,
                    origin: ResponseOrigin::Mock,
                });
            }
            Ok(None) => debug!(service, %fingerprint, "No mock record"),
            Err(err) => warn!(service, %fingerprint, error = %err, "Ignoring unreadable mock record"),
        }

        let url = upstream_url(descriptor, &request.path, &request.query)?;
        let outbound = outbound_headers(descriptor, self.max_stale);

        let response = self.client.get(&url, &outbound).await?;

        let body: Value = serde_json::from_slice(&response.body).map_err(|source| {
            BridgeError::InvalidUpstreamBody {
                service: service.to_string(),
                source,
            }
        })?;

        let forwarded = headers::propagated_headers(&response.headers);

        let record = MockRecord {
            headers: forwarded.clone(),
            body,
        };
        match self.mocks.save(service, &fingerprint, &record).await {
            Ok(path) => info!(service, path = %path.display(), "Recorded mock"),
            Err(err) => warn!(service, error = %err, "Error writing mock file"),
        }

        Ok(BridgeResponse {
            headers: forwarded,
            body: record.body,
            origin: ResponseOrigin::Upstream {
                from_cache: response.from_cache,
            },
        })
    }
}

/// Join the descriptor base URL and the upstream path, then merge the query:
/// caller pairs first, overlay pairs last, overlay keys replacing caller keys
pub fn upstream_url(
    descriptor: &ServiceDescriptor,
    path: &str,
    query: &[(String, String)],
) -> Result<Url> {
    let base = descriptor.base_url.as_str();
    let joined = if path.is_empty() {
        base.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };

    let mut url = Url::parse(&joined).map_err(|e| BridgeError::InvalidUpstreamUrl {
        service: descriptor.kind.to_string(),
        reason: e.to_string(),
    })?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query
            .iter()
            .filter(|(key, _)| !descriptor.query.contains_key(key))
        {
            pairs.append_pair(key, value);
        }
        for (key, value) in &descriptor.query {
            pairs.append_pair(key, value);
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Overlay headers plus the stale-tolerant Cache-Control directive
pub fn outbound_headers(descriptor: &ServiceDescriptor, max_stale: Duration) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in &descriptor.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(service = %descriptor.kind, header = %name, "Skipping invalid overlay header"),
        }
    }

    let directive = format!("max-stale={}", max_stale.as_secs());
    if let Ok(value) = HeaderValue::try_from(directive) {
        headers.insert(header::CACHE_CONTROL, value);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FjallCache;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn test_bridge(temp: &TempDir, registry: ServiceRegistry) -> Bridge {
        let cache = Arc::new(FjallCache::open(temp.path().join("cache")).unwrap());
        let client = UpstreamClient::new(ClientConfig::default(), cache).unwrap();
        Bridge::new(
            registry,
            MockStore::new(temp.path()),
            client,
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_upstream_url_joins_path_and_appends_overlay() {
        let unsplash = ServiceDescriptor::new(ServiceKind::Unsplash).with_api_key("KEY");
        let url = upstream_url(&unsplash, "", &pairs(&[("query", "cats")])).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.unsplash.com/search/photos/?query=cats&client_id=KEY"
        );

        let flickr = ServiceDescriptor::new(ServiceKind::Flickr).with_base_url("http://h/rest/");
        let url = upstream_url(&flickr, "/v2/photos", &[]).unwrap();
        assert_eq!(url.as_str(), "http://h/rest/v2/photos");
    }

    #[test]
    fn test_overlay_wins_on_conflict() {
        let pixabay = ServiceDescriptor::new(ServiceKind::Pixabay).with_api_key("real");
        let url = upstream_url(
            &pixabay,
            "",
            &pairs(&[("key", "spoofed"), ("q", "dogs")]),
        )
        .unwrap();

        assert_eq!(url.as_str(), "https://pixabay.com/api/?q=dogs&key=real");
    }

    #[test]
    fn test_no_query_leaves_no_question_mark() {
        let splashbase = ServiceDescriptor::new(ServiceKind::Splashbase);
        let url = upstream_url(&splashbase, "", &[]).unwrap();
        assert_eq!(url.as_str(), "http://www.splashbase.co/api/v1/images/search");
    }

    #[test]
    fn test_invalid_base_url() {
        let broken = ServiceDescriptor::new(ServiceKind::Flickr).with_base_url("");
        let err = upstream_url(&broken, "rest", &[]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidUpstreamUrl { .. }));
    }

    #[test]
    fn test_outbound_headers() {
        let pexels = ServiceDescriptor::new(ServiceKind::Pexels).with_api_key("p-key");
        let headers = outbound_headers(&pexels, Duration::from_secs(3600));

        assert_eq!(headers["authorization"], "p-key");
        assert_eq!(headers[header::CACHE_CONTROL], "max-stale=3600");
        assert_eq!(max_stale(&headers), Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected_before_any_lookup() {
        let temp = TempDir::new().unwrap();
        let bridge = test_bridge(&temp, ServiceRegistry::with_defaults());

        let err = bridge
            .handle(&BridgeRequest {
                service: "foo".to_string(),
                path: "search".to_string(),
                query: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::UnknownService(ref name) if name == "foo"));
    }

    #[tokio::test]
    async fn test_mock_record_short_circuits_network() {
        let temp = TempDir::new().unwrap();
        // Unroutable upstream: any network attempt would fail the test
        let mut registry = ServiceRegistry::new();
        registry.register(
            ServiceDescriptor::new(ServiceKind::Stocksnap).with_base_url("http://127.0.0.1:9/"),
        );
        let bridge = test_bridge(&temp, registry);

        let request = BridgeRequest {
            service: "stocksnap".to_string(),
            path: "nature".to_string(),
            query: pairs(&[("page", "1")]),
        };
        let mut stored = BTreeMap::new();
        stored.insert("x-total".to_string(), "3".to_string());
        stored.insert("set-cookie".to_string(), "sneaky=1".to_string());
        bridge
            .mocks()
            .save(
                "stocksnap",
                &Fingerprint::of(&request.path, &request.query),
                &MockRecord {
                    headers: stored,
                    body: json!({"data": [1, 2, 3]}),
                },
            )
            .await
            .unwrap();

        let response = bridge.handle(&request).await.unwrap();

        assert_eq!(response.origin, ResponseOrigin::Mock);
        assert_eq!(response.body, json!({"data": [1, 2, 3]}));
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.headers["x-total"], "3");
    }
}
