//! Image uploads with collision-safe naming

pub mod naming;
mod store;

pub use store::{StoredFile, UploadStore};

use std::path::PathBuf;

use thiserror::Error;

/// Content types accepted on upload
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/png", "image/jpg", "image/jpeg", "image/gif"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Only .png .gif .jpg and .jpeg format allowed!")]
    UnsupportedType { content_type: Option<String> },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("at most {limit} files per request")]
    TooManyFiles { limit: usize },

    #[error("no free name for {name} after {attempts} attempts")]
    NoFreeName { name: String, attempts: usize },

    #[error("failed to prepare upload directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),
}

pub type Result<T> = std::result::Result<T, UploadError>;

/// Reject parts whose declared content type is not an allowed image type
pub fn check_content_type(content_type: Option<&str>) -> Result<()> {
    let essence = content_type
        .and_then(|raw| raw.parse::<mime::Mime>().ok())
        .map(|parsed| parsed.essence_str().to_ascii_lowercase());

    match essence {
        Some(essence) if ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) => Ok(()),
        _ => Err(UploadError::UnsupportedType {
            content_type: content_type.map(str::to_string),
        }),
    }
}

/// Content type a stored file is served as, decided by extension
pub fn content_type_for(name: &str) -> Option<mime::Mime> {
    match naming::extension(name)?.as_str() {
        "png" => Some(mime::IMAGE_PNG),
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "gif" => Some(mime::IMAGE_GIF),
        _ => None,
    }
}

pub fn is_image_name(name: &str) -> bool {
    content_type_for(name).is_some()
}
