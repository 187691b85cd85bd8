use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use reqwest::Url;
use serde::Deserialize;

use super::{ImageError, Result};

/// Largest width or height the transform endpoint will produce
pub const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMethod {
    Placeholder,
    Resize,
    Cover,
    Aspect,
}

impl FromStr for TransformMethod {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "placeholder" => Ok(Self::Placeholder),
            "resize" => Ok(Self::Resize),
            "cover" => Ok(Self::Cover),
            "aspect" => Ok(Self::Aspect),
            other => Err(ImageError::UnknownMethod(other.to_string())),
        }
    }
}

/// `w,h` where either side may be `null`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn both(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

impl FromStr for Dimensions {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        let (width, height) = s
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidParams(s.to_string()))?;

        Ok(Self {
            width: parse_side(width, s)?,
            height: parse_side(height, s)?,
        })
    }
}

fn parse_side(side: &str, raw: &str) -> Result<Option<u32>> {
    let side = side.trim();
    if side.eq_ignore_ascii_case("null") || side.is_empty() {
        return Ok(None);
    }

    let value: u32 = side
        .parse()
        .map_err(|_| ImageError::InvalidParams(raw.to_string()))?;

    if value == 0 {
        return Err(ImageError::InvalidParams(raw.to_string()));
    }
    if value > MAX_DIMENSION {
        return Err(ImageError::TooLarge { max: MAX_DIMENSION });
    }
    Ok(Some(value))
}

/// Query string of `GET /img/`
#[derive(Debug, Clone, Deserialize)]
pub struct ImageQuery {
    pub src: Option<String>,
    pub method: String,
    pub params: Option<String>,
}

/// Validated transform, ready for an [`super::ImageProcessor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Placeholder { width: u32, height: u32 },
    Resize { source: PathBuf, size: Dimensions },
    Cover { source: PathBuf, width: u32, height: u32 },
    Aspect { source: PathBuf, width: u32, height: u32 },
}

impl ImageQuery {
    pub fn into_transform(self, root: &Path) -> Result<Transform> {
        let method: TransformMethod = self.method.parse()?;
        let size: Dimensions = match self.params.as_deref() {
            Some(params) => params.parse()?,
            None if method == TransformMethod::Resize => Dimensions {
                width: None,
                height: None,
            },
            None => return Err(ImageError::InvalidParams(String::new())),
        };

        let both = || {
            size.both()
                .ok_or_else(|| ImageError::InvalidParams(self.params.clone().unwrap_or_default()))
        };
        let source = || {
            let src = self.src.as_deref().ok_or(ImageError::MissingSource)?;
            source_path(root, src)
        };

        match method {
            TransformMethod::Placeholder => {
                let (width, height) = both()?;
                Ok(Transform::Placeholder { width, height })
            }
            TransformMethod::Resize => Ok(Transform::Resize {
                source: source()?,
                size,
            }),
            TransformMethod::Cover => {
                let (width, height) = both()?;
                Ok(Transform::Cover {
                    source: source()?,
                    width,
                    height,
                })
            }
            TransformMethod::Aspect => {
                let (width, height) = both()?;
                Ok(Transform::Aspect {
                    source: source()?,
                    width,
                    height,
                })
            }
        }
    }
}

/// Map `src` (absolute or relative URL) to a file under `root`
///
/// Only the URL path is used. It is percent-decoded and must not contain
/// `..` components after decoding.
pub fn source_path(root: &Path, src: &str) -> Result<PathBuf> {
    // Joining onto a dummy base accepts relative references and leaves
    // absolute URLs untouched
    let url = Url::parse("http://localhost/")
        .and_then(|base| base.join(src))
        .map_err(|_| ImageError::InvalidSource(src.to_string()))?;

    let decoded = urlencoding::decode(url.path())
        .map_err(|_| ImageError::InvalidSource(src.to_string()))?;

    let mut path = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                depth += 1;
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(ImageError::Traversal(src.to_string()));
            }
        }
    }

    if depth == 0 {
        return Err(ImageError::InvalidSource(src.to_string()));
    }
    Ok(path)
}

/// Largest region of a `src_w×src_h` image with the ratio `width:height`
pub fn aspect_region(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    let ratio = f64::from(width) / f64::from(height);
    let source_ratio = f64::from(src_w) / f64::from(src_h);

    let (w, h) = if ratio > source_ratio {
        (f64::from(src_w), (f64::from(src_w) / ratio).round())
    } else {
        ((f64::from(src_h) * ratio).round(), f64::from(src_h))
    };

    ((w as u32).max(1), (h as u32).max(1))
}
