#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use stockbridge::api::{AppState, router};
use stockbridge::bridge::ServiceKind;
use stockbridge::config::{Config, ServiceOverride};

/// Config with every on-disk path inside `temp` and every service pointed
/// at `{upstream}/{service}/`
pub fn test_config(temp: &TempDir, upstream: &str) -> Config {
    let mut config = Config::default();
    config.bridge.mock_dir = temp.path().join("mock");
    config.bridge.cache_path = temp.path().join("cache").join("responses");
    config.bridge.request_timeout_secs = 5;
    config.uploads.dir = temp.path().join("uploads");
    config.images.root = temp.path().to_path_buf();

    for kind in ServiceKind::ALL {
        config.services.insert(
            kind.as_str().to_string(),
            ServiceOverride {
                base_url: Some(format!("{}/{}/", upstream, kind)),
            },
        );
    }

    config
}

pub async fn build_test_app(config: Config) -> (Router, AppState) {
    let state = AppState::from_config(config)
        .await
        .expect("Failed to build app state");
    (router(state.clone()), state)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, headers, body) = send(app, request).await;
    let json = serde_json::from_slice(&body).expect("response body is not JSON");
    (status, headers, json)
}
