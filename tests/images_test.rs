mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use common::{build_test_app, get_json, send, test_config};

async fn get_image(app: &axum::Router, uri: &str) -> (StatusCode, String, DynamicImage) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, headers, body) = send(app, request).await;
    let content_type = headers[header::CONTENT_TYPE].to_str().unwrap().to_string();
    let decoded = image::load_from_memory(&body).expect("response is not an image");
    (status, content_type, decoded)
}

fn write_upload(temp: &TempDir, name: &str, width: u32, height: u32, format: ImageFormat) {
    let dir = temp.path().join("uploads");
    std::fs::create_dir_all(&dir).unwrap();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 10, 10])))
        .save_with_format(dir.join(name), format)
        .unwrap();
}

#[tokio::test]
async fn test_placeholder() {
    let temp = TempDir::new().unwrap();
    let (app, state) = build_test_app(test_config(&temp, "http://127.0.0.1:9")).await;

    let (status, content_type, img) =
        get_image(&app, "/img/?method=placeholder&params=320%2C240").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/png");
    assert_eq!((img.width(), img.height()), (320, 240));
    assert_eq!(img.to_rgb8().get_pixel(0, 0), &Rgb([0x80, 0x80, 0x80]));
    assert_eq!(state.metrics.snapshot().images_rendered, 1);
}

#[tokio::test]
async fn test_resize_uploaded_file_by_thumbnail_url() {
    let temp = TempDir::new().unwrap();
    write_upload(&temp, "wide (1).png", 400, 200, ImageFormat::Png);
    let (app, _state) = build_test_app(test_config(&temp, "http://127.0.0.1:9")).await;

    // Same shape as the thumbnailUrl handed out by the upload listing
    let (status, content_type, img) = get_image(
        &app,
        "/img/?src=%2Fuploads%2Fwide%2520%25281%2529.png&method=resize&params=180%2C180",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/png");
    assert_eq!((img.width(), img.height()), (180, 90));
}

#[tokio::test]
async fn test_resize_with_null_width() {
    let temp = TempDir::new().unwrap();
    write_upload(&temp, "tall.jpg", 100, 300, ImageFormat::Jpeg);
    let (app, _state) = build_test_app(test_config(&temp, "http://127.0.0.1:9")).await;

    let (status, content_type, img) =
        get_image(&app, "/img?src=/uploads/tall.jpg&method=resize&params=null,150").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/jpeg");
    assert_eq!((img.width(), img.height()), (50, 150));
}

#[tokio::test]
async fn test_cover_and_aspect() {
    let temp = TempDir::new().unwrap();
    write_upload(&temp, "photo.png", 300, 100, ImageFormat::Png);
    let (app, _state) = build_test_app(test_config(&temp, "http://127.0.0.1:9")).await;

    let (status, _, cover) =
        get_image(&app, "/img/?src=/uploads/photo.png&method=cover&params=64,64").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((cover.width(), cover.height()), (64, 64));

    let (status, _, aspect) =
        get_image(&app, "/img/?src=/uploads/photo.png&method=aspect&params=16,9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!((aspect.width(), aspect.height()), (178, 100));
}

#[tokio::test]
async fn test_transform_errors() {
    let temp = TempDir::new().unwrap();
    write_upload(&temp, "a.png", 10, 10, ImageFormat::Png);
    let (app, _state) = build_test_app(test_config(&temp, "http://127.0.0.1:9")).await;

    let (status, _, body) = get_json(&app, "/img/?src=/uploads/missing.png&method=resize&params=10,10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _, _) = get_json(
        &app,
        "/img/?src=%2Fuploads%2F..%252F..%252Fetc%252Fpasswd&method=resize&params=10,10",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = get_json(&app, "/img/?src=/uploads/a.png&method=rotate&params=10,10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");

    let (status, _, _) = get_json(&app, "/img/?src=/uploads/a.png&method=cover&params=ten,10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = get_json(&app, "/img/?src=/uploads/a.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYLOAD");
}
