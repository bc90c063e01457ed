// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use image::{Rgb, RgbImage};
use snapcal::config::Config;
use snapcal::db::Db;
use snapcal::routes::create_router;
use snapcal::services::image::encode_jpeg;
use snapcal::services::VisionClient;
use snapcal::AppState;
use std::sync::Arc;

/// Create a test app with an in-memory store and a mock vision client.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::default(), VisionClient::mock())
}

/// Create a test app with explicit config and vision client.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config, client: VisionClient) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Db::in_memory(), client));
    (create_router(state.clone()), state)
}

/// Build a JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a bodiless request.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Image whose left half is red and right half blue.
#[allow(dead_code)]
pub fn split_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([220, 20, 20])
        } else {
            Rgb([20, 20, 220])
        }
    })
}

/// Deterministic noisy image that compresses poorly.
#[allow(dead_code)]
pub fn noisy_image(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x1234_5678;
    RgbImage::from_fn(width, height, |_, _| {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [a, b, c, _] = state.to_le_bytes();
        Rgb([a, b, c])
    })
}

/// Split image whose top `noisy_rows` rows are noise, like a photo with a
/// busy background above a plain subject.
#[allow(dead_code)]
pub fn textured_split_image(width: u32, height: u32, noisy_rows: u32) -> RgbImage {
    let noise = noisy_image(width, noisy_rows);
    let mut img = split_image(width, height);
    image::imageops::replace(&mut img, &noise, 0, 0);
    img
}

#[allow(dead_code)]
pub fn jpeg_bytes_at(img: &RgbImage, quality: u8) -> Vec<u8> {
    encode_jpeg(img, quality).unwrap()
}

#[allow(dead_code)]
pub fn jpeg_bytes(img: &RgbImage) -> Vec<u8> {
    encode_jpeg(img, 90).unwrap()
}

#[allow(dead_code)]
pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Insert a minimal EXIF APP1 segment carrying `orientation` right after
/// the JPEG SOI marker.
#[allow(dead_code)]
pub fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08"); // big-endian, IFD0 at 8
    tiff.extend_from_slice(&1u16.to_be_bytes()); // one entry
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes()); // count
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]); // value padding
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}
