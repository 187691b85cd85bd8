//! On-disk replay records, one JSON file per (service, fingerprint)

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::fingerprint::Fingerprint;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("failed to read mock {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("mock {path} is not a valid record: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write mock {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode mock record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persisted replay of one upstream response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockRecord {
    /// `x-*` headers only
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct MockStore {
    dir: PathBuf,
}

impl MockStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, service: &str, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}-{}.json", service, fingerprint))
    }

    /// A missing file is a normal miss and yields `Ok(None)`
    pub async fn load(
        &self,
        service: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Option<MockRecord>, MockError> {
        let path = self.path_for(service, fingerprint);

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(MockError::Read { path, source }),
        };

        let record = serde_json::from_slice(&raw).map_err(|source| MockError::Parse {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Loaded mock record");
        Ok(Some(record))
    }

    /// Write through a temp file and rename so readers never see a partial record
    pub async fn save(
        &self,
        service: &str,
        fingerprint: &Fingerprint,
        record: &MockRecord,
    ) -> Result<PathBuf, MockError> {
        let path = self.path_for(service, fingerprint);
        let tmp = self
            .dir
            .join(format!(".{}-{}.{}.tmp", service, fingerprint, uuid::Uuid::new_v4()));

        let encoded = encode_pretty(record)?;

        if let Err(source) = tokio::fs::write(&tmp, &encoded).await {
            return Err(MockError::Write { path: tmp, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(MockError::Write { path, source });
        }

        debug!(path = %path.display(), bytes = encoded.len(), "Saved mock record");
        Ok(path)
    }

    /// Create the mock directory if it is missing
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }
}

/// One-space indentation, matching the existing fixtures in mock directories
fn encode_pretty(record: &MockRecord) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    record.serialize(&mut serializer)?;
    Ok(out)
}
