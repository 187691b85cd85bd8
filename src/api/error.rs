use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

use super::models::ErrorResponse;
use crate::bridge::{BridgeError, UpstreamError};
use crate::imaging::ImageError;
use crate::uploads::UploadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidPayload(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    UnknownService(String),
    #[error("{0}")]
    UpstreamUnavailable(String),
    #[error("{0}")]
    UpstreamStatus(String),
    #[error("{0}")]
    UpstreamTimeout(String),
    #[error("{0}")]
    InvalidUpstreamBody(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnknownService(_)
            | ApiError::UpstreamUnavailable(_)
            | ApiError::UpstreamStatus(_)
            | ApiError::InvalidUpstreamBody(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UnknownService(_) => "UNKNOWN_SERVICE",
            ApiError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ApiError::UpstreamStatus(_) => "UPSTREAM_STATUS",
            ApiError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            ApiError::InvalidUpstreamBody(_) => "INVALID_UPSTREAM_BODY",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };

        (status, Json(json!(body))).into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        let message = err.to_string();
        match err {
            BridgeError::UnknownService(_) => ApiError::UnknownService(message),
            BridgeError::InvalidUpstreamUrl { .. } => ApiError::UpstreamUnavailable(message),
            BridgeError::InvalidUpstreamBody { .. } => ApiError::InvalidUpstreamBody(message),
            BridgeError::Upstream(upstream) => match upstream {
                UpstreamError::Timeout(_) => ApiError::UpstreamTimeout(message),
                UpstreamError::Status { .. } => ApiError::UpstreamStatus(message),
                UpstreamError::RequestFailed(_) => ApiError::UpstreamUnavailable(message),
                UpstreamError::Build(_) => ApiError::Internal(message),
            },
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::UnsupportedType { .. }
            | UploadError::InvalidName(_)
            | UploadError::TooManyFiles { .. } => ApiError::InvalidPayload(message),
            UploadError::NoFreeName { .. } | UploadError::Io { .. } | UploadError::Store(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        let message = err.to_string();
        match err {
            ImageError::UnknownMethod(_)
            | ImageError::InvalidParams(_)
            | ImageError::TooLarge { .. }
            | ImageError::MissingSource
            | ImageError::InvalidSource(_)
            | ImageError::Traversal(_) => ApiError::InvalidPayload(message),
            ImageError::NotFound { .. } => ApiError::NotFound(message),
            ImageError::Encode(_) | ImageError::Task(_) => ApiError::Internal(message),
        }
    }
}
