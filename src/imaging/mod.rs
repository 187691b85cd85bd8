//! On-the-fly image transforms for `GET /img/`

pub mod params;
mod processor;

pub use params::{Dimensions, ImageQuery, Transform, TransformMethod, aspect_region, source_path};
pub use processor::{ImageCrateProcessor, ImageProcessor, RenderedImage, placeholder};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("invalid params '{0}', expected <width>,<height>")]
    InvalidParams(String),

    #[error("dimensions larger than {max}px are not supported")]
    TooLarge { max: u32 },

    #[error("missing src parameter")]
    MissingSource,

    #[error("invalid src '{0}'")]
    InvalidSource(String),

    #[error("src '{0}' escapes the image root")]
    Traversal(String),

    #[error("{path}: {reason}")]
    NotFound { path: PathBuf, reason: String },

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("image task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ImageError>;
