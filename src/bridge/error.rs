use thiserror::Error;

use super::client::UpstreamError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("cannot build upstream URL for {service}: {reason}")]
    InvalidUpstreamUrl { service: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("{service} returned a body that is not JSON: {source}")]
    InvalidUpstreamBody {
        service: String,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
