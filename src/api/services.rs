use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartError,
        rejection::QueryRejection,
    },
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use super::{
    error::ApiError,
    models::{FileListResponse, HealthResponse},
    state::AppState,
    utils::{LIST_THUMBNAIL, UPLOAD_THUMBNAIL, request_origin, uploaded_file},
};
use crate::bridge::headers::{X_CACHED, X_MOCKED};
use crate::bridge::{BridgeRequest, BridgeResponse, ResponseOrigin};
use crate::imaging::ImageQuery;
use crate::uploads::{UploadError, check_content_type};

/// Multipart field carrying uploaded files
const FILES_FIELD: &str = "files[]";

/// Bridge endpoint (GET /bridge/{service}/{*path})
///
/// Answers from the mock directory when a record for this exact request
/// exists, otherwise calls the upstream through the shared cache and records
/// the answer. Only `x-*` upstream headers are forwarded.
pub async fn bridge(
    State(state): State<AppState>,
    Path((service, path)): Path<(String, String)>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    forward(&state, BridgeRequest {
        service,
        path,
        query,
    })
    .await
}

/// Bridge endpoint with an empty upstream path (GET /bridge/{service}/)
pub async fn bridge_root(
    State(state): State<AppState>,
    Path(service): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    forward(&state, BridgeRequest {
        service,
        path: String::new(),
        query,
    })
    .await
}

async fn forward(state: &AppState, request: BridgeRequest) -> Result<Response, ApiError> {
    match state.bridge.handle(&request).await {
        Ok(response) => {
            match response.origin {
                ResponseOrigin::Mock => state.metrics.bridge_mocked(),
                ResponseOrigin::Upstream { from_cache: true } => state.metrics.bridge_cached(),
                ResponseOrigin::Upstream { from_cache: false } => state.metrics.bridge_fetched(),
            }
            Ok(bridge_response(response))
        }
        Err(err) => {
            state.metrics.bridge_failed();
            error!(service = %request.service, path = %request.path, error = %err, "Bridge request failed");
            Err(err.into())
        }
    }
}

fn bridge_response(response: BridgeResponse) -> Response {
    let mut headers = HeaderMap::new();

    for (name, value) in &response.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Dropping unrepresentable header"),
        }
    }

    match response.origin {
        ResponseOrigin::Mock => {
            headers.insert(X_MOCKED, HeaderValue::from_static("true"));
        }
        ResponseOrigin::Upstream { from_cache } => {
            let flag = if from_cache { "true" } else { "false" };
            headers.insert(X_CACHED, HeaderValue::from_static(flag));
        }
    }

    (StatusCode::OK, headers, Json(response.body)).into_response()
}

/// Upload listing (GET /upload/)
pub async fn list_uploads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FileListResponse>, ApiError> {
    let origin = request_origin(&headers);
    let url_prefix = &state.config.uploads.url_prefix;

    let files = state
        .uploads
        .list_images()
        .await?
        .into_iter()
        .map(|file| uploaded_file(&origin, url_prefix, file, LIST_THUMBNAIL))
        .collect();

    Ok(Json(FileListResponse { files }))
}

/// Upload endpoint (POST /upload/)
///
/// Accepts up to `uploads.max_files` parts named `files[]`. Every part is
/// checked for an image content type before it is stored; parts stored
/// before a rejected one are kept.
pub async fn upload_files(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<FileListResponse>, ApiError> {
    let origin = request_origin(&headers);
    let url_prefix = &state.config.uploads.url_prefix;
    let limit = state.config.uploads.max_files;

    let mut files = Vec::new();
    let mut seen = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        seen += 1;
        if seen > limit {
            return Err(UploadError::TooManyFiles { limit }.into());
        }

        check_content_type(field.content_type())?;
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        let stored = state.uploads.store(&file_name, data).await?;
        state.metrics.upload_stored();
        files.push(uploaded_file(&origin, url_prefix, stored, UPLOAD_THUMBNAIL));
    }

    if files.is_empty() {
        return Err(ApiError::InvalidPayload(format!(
            "no '{}' parts in request",
            FILES_FIELD
        )));
    }

    info!(count = files.len(), "Upload request stored");
    Ok(Json(FileListResponse { files }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidPayload(err.body_text())
    }
}

/// Image transform (GET /img/?src=..&method=..&params=w,h)
pub async fn transform_image(
    State(state): State<AppState>,
    query: Result<Query<ImageQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;

    let transform = query.into_transform(&state.config.images.root)?;
    let rendered = state.images.render(transform).await?;
    state.metrics.image_rendered();

    Ok(([(header::CONTENT_TYPE, rendered.content_type)], rendered.bytes).into_response())
}

/// Health check endpoint (GET /health)
///
/// Returns 503 when the response cache or the upload store cannot be read.
/// A missing mock directory only degrades recording and is reported as
/// `degraded`.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();

    components.insert("api".to_string(), "healthy".to_string());

    let cache = match state.cache.check() {
        Ok(()) => "healthy",
        Err(err) => {
            warn!(error = %err, "Response cache health check failed");
            "unhealthy"
        }
    };
    components.insert("cache".to_string(), cache.to_string());

    let mock_dir = state.bridge.mocks().dir();
    let mock_store = match tokio::fs::metadata(mock_dir).await {
        Ok(meta) if meta.is_dir() => "healthy",
        _ => "degraded",
    };
    components.insert("mock_store".to_string(), mock_store.to_string());

    let uploads = match state.uploads.check().await {
        Ok(()) => "healthy",
        Err(err) => {
            warn!(error = %err, "Upload store health check failed");
            "unhealthy"
        }
    };
    components.insert("uploads".to_string(), uploads.to_string());

    let healthy = components.values().all(|status| status != "unhealthy");
    let (status_code, overall) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}
