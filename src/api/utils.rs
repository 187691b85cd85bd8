//! API utility functions
//!
//! Pure helpers for building the URLs returned by the upload endpoints.

use axum::http::{HeaderMap, header};

use super::models::UploadedFile;
use crate::uploads::StoredFile;

/// Thumbnail box for listings
pub const LIST_THUMBNAIL: (u32, u32) = (180, 180);
/// Thumbnail box for freshly uploaded files
pub const UPLOAD_THUMBNAIL: (u32, u32) = (90, 90);

/// `scheme://host` of the incoming request
///
/// The scheme comes from `X-Forwarded-Proto` when a proxy sets it.
pub fn request_origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("localhost");

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .filter(|value| value.eq_ignore_ascii_case("https"))
        .map_or("http", |_| "https");

    format!("{}://{}", scheme, host)
}

/// Public path of a stored file, e.g. `/uploads/a%20(1).png`
pub fn public_path(url_prefix: &str, name: &str) -> String {
    format!(
        "{}/{}",
        url_prefix.trim_end_matches('/'),
        urlencoding::encode(name)
    )
}

/// `/img/` resize URL for a stored file
pub fn thumbnail_url(url_prefix: &str, name: &str, (width, height): (u32, u32)) -> String {
    let src = public_path(url_prefix, name);
    let params = format!("{},{}", width, height);
    format!(
        "/img/?src={}&method=resize&params={}",
        urlencoding::encode(&src),
        urlencoding::encode(&params)
    )
}

pub fn uploaded_file(
    origin: &str,
    url_prefix: &str,
    file: StoredFile,
    thumbnail: (u32, u32),
) -> UploadedFile {
    UploadedFile {
        url: format!("{}{}", origin, public_path(url_prefix, &file.name)),
        thumbnail_url: thumbnail_url(url_prefix, &file.name, thumbnail),
        name: file.name,
        size: file.size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_origin() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers), "http://localhost");

        headers.insert(header::HOST, HeaderValue::from_static("dev.local:9008"));
        assert_eq!(request_origin(&headers), "http://dev.local:9008");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_origin(&headers), "https://dev.local:9008");
    }

    #[test]
    fn test_thumbnail_url_is_encoded() {
        assert_eq!(
            thumbnail_url("/uploads", "a.png", LIST_THUMBNAIL),
            "/img/?src=%2Fuploads%2Fa.png&method=resize&params=180%2C180"
        );
        assert_eq!(
            thumbnail_url("/uploads/", "a (1).png", UPLOAD_THUMBNAIL),
            "/img/?src=%2Fuploads%2Fa%2520%25281%2529.png&method=resize&params=90%2C90"
        );
    }

    #[test]
    fn test_uploaded_file() {
        let file = uploaded_file(
            "http://localhost:9008",
            "/uploads",
            StoredFile {
                name: "cat.gif".to_string(),
                size: 42,
            },
            LIST_THUMBNAIL,
        );

        assert_eq!(file.url, "http://localhost:9008/uploads/cat.gif");
        assert_eq!(file.size, 42);
        assert!(file.thumbnail_url.starts_with("/img/?src=%2Fuploads%2Fcat.gif"));
    }
}
