//! JSON bodies of the upload, health and error responses
//!
//! Bridge responses are passed through as the upstream's own JSON and have
//! no model here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;

/// One entry of an upload listing or upload result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub url: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
