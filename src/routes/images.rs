// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image normalization route.

use crate::error::Result;
use crate::services::{NormalizeError, NormalizedImage, RawImageInput};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/images/normalize", post(normalize))
}

/// Normalize a raw image upload. The `Content-Type` header is the declared format.
async fn normalize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<NormalizedImage>> {
    let limit = state.config.max_upload_bytes;
    let bytes = match body {
        Ok(bytes) => bytes,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let size = headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(limit + 1);
            return Err(NormalizeError::FileTooLarge { size, limit }.into());
        }
        Err(rejection) => {
            return Err(crate::error::AppError::BadRequest(rejection.body_text()));
        }
    };

    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    // Decode/resize/encode is CPU-bound
    let worker_state = state.clone();
    let normalized = tokio::task::spawn_blocking(move || {
        worker_state
            .normalizer
            .normalize(RawImageInput::new(&bytes, mime.as_deref()))
    })
    .await
    .map_err(|e| anyhow::anyhow!("image worker failed: {}", e))??;

    tracing::info!(
        original_bytes = normalized.original_byte_size,
        compressed_bytes = normalized.compressed_byte_size,
        width = normalized.pixel_width,
        height = normalized.pixel_height,
        quality = normalized.quality,
        "Image normalized"
    );

    Ok(Json(normalized))
}
