use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use tracing::debug;

use super::params::{Dimensions, MAX_DIMENSION, Transform, aspect_region};
use super::{ImageError, Result};

const PLACEHOLDER_BACKGROUND: Rgb<u8> = Rgb([0x80, 0x80, 0x80]);
const PLACEHOLDER_STRIPE: Rgb<u8> = Rgb([0x70, 0x70, 0x70]);
const PLACEHOLDER_BAND: u32 = 40;

const FILTER: FilterType = FilterType::CatmullRom;

#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Renders a validated [`Transform`] to encoded image bytes
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    async fn render(&self, transform: Transform) -> Result<RenderedImage>;
}

/// Processor backed by the `image` crate, run on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateProcessor;

#[async_trait]
impl ImageProcessor for ImageCrateProcessor {
    async fn render(&self, transform: Transform) -> Result<RenderedImage> {
        tokio::task::spawn_blocking(move || render_blocking(transform))
            .await
            .map_err(|e| ImageError::Task(e.to_string()))?
    }
}

fn render_blocking(transform: Transform) -> Result<RenderedImage> {
    match transform {
        Transform::Placeholder { width, height } => {
            encode(DynamicImage::ImageRgb8(placeholder(width, height)), ImageFormat::Png)
        }
        Transform::Resize { source, size } => {
            let (img, format) = open(&source)?;
            encode(resize(img, size)?, format)
        }
        Transform::Cover {
            source,
            width,
            height,
        } => {
            let (img, format) = open(&source)?;
            encode(img.resize_to_fill(width, height, FILTER), format)
        }
        Transform::Aspect {
            source,
            width,
            height,
        } => {
            let (img, format) = open(&source)?;
            let (w, h) = aspect_region(img.width(), img.height(), width, height);
            encode(img.resize_to_fill(w, h, FILTER), format)
        }
    }
}

/// Grey canvas with diagonal stripes
pub fn placeholder(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if ((x + y) / PLACEHOLDER_BAND) % 2 == 0 {
            PLACEHOLDER_BACKGROUND
        } else {
            PLACEHOLDER_STRIPE
        }
    })
}

/// A side derived from the source aspect ratio is bounded like a given one
fn resize(img: DynamicImage, size: Dimensions) -> Result<DynamicImage> {
    let (src_w, src_h) = (img.width(), img.height());

    let resized = match (size.width, size.height) {
        (Some(w), Some(h)) => img.resize(w, h, FILTER),
        (Some(w), None) => {
            let h = scale(src_h, w, src_w)?;
            img.resize_exact(w, h, FILTER)
        }
        (None, Some(h)) => {
            let w = scale(src_w, h, src_h)?;
            img.resize_exact(w, h, FILTER)
        }
        (None, None) => img,
    };
    Ok(resized)
}

/// `value * num / den`, rounded, at least 1 and at most [`MAX_DIMENSION`]
fn scale(value: u32, num: u32, den: u32) -> Result<u32> {
    let scaled = (f64::from(value) * f64::from(num) / f64::from(den)).round();
    if scaled > f64::from(MAX_DIMENSION) {
        return Err(ImageError::TooLarge { max: MAX_DIMENSION });
    }
    Ok((scaled as u32).max(1))
}

fn open(path: &Path) -> Result<(DynamicImage, ImageFormat)> {
    let not_found = |reason: String| ImageError::NotFound {
        path: path.to_path_buf(),
        reason,
    };

    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| not_found(e.to_string()))?;

    let format = reader.format();
    let img = reader.decode().map_err(|e| not_found(e.to_string()))?;

    debug!(path = %path.display(), ?format, width = img.width(), height = img.height(), "Decoded source image");

    // Keep the source format when we can encode it
    let format = match format {
        Some(f @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif)) => f,
        _ => ImageFormat::Png,
    };
    Ok((img, format))
}

fn encode(img: DynamicImage, format: ImageFormat) -> Result<RenderedImage> {
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => img,
    };

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(RenderedImage {
        content_type: format.to_mime_type(),
        bytes,
        width: img.width(),
        height: img.height(),
    })
}
