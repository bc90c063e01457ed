// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food photo analysis routes.

use crate::error::{AppError, Result};
use crate::models::{AnalyzeRequest, AnalyzeResponse};
use crate::routes::json_body;
use crate::services::vision::strip_data_url;
use crate::services::NormalizeError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/{request_id}/cancel", post(cancel))
}

/// Analyze a normalized JPEG with the vision model.
async fn analyze(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let request = json_body(body)?;
    request.validate()?;

    let format = request.format.to_ascii_lowercase();
    if format != "jpeg" && format != "jpg" {
        return Err(NormalizeError::UnsupportedFormat(request.format).into());
    }

    let decoded = STANDARD
        .decode(strip_data_url(&request.image))
        .map_err(|_| AppError::BadRequest("image is not valid base64".to_string()))?;
    let limit = state.config.max_upload_bytes;
    if decoded.len() > limit {
        return Err(NormalizeError::FileTooLarge {
            size: decoded.len(),
            limit,
        }
        .into());
    }

    tracing::info!(
        request_id = ?request.request_id,
        image_bytes = decoded.len(),
        mock = state.analysis.client().is_mock(),
        "Analyzing food photo"
    );

    let data = state
        .analysis
        .analyze(&request.image, request.request_id.as_deref())
        .await?;

    tracing::info!(
        request_id = ?request.request_id,
        foods = data.foods.len(),
        total_calories = data.total_calories,
        "Analysis complete"
    );

    Ok(Json(AnalyzeResponse::ok(data)))
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Cancel an in-flight analysis by the id the client supplied.
async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<String>,
) -> Result<Json<CancelResponse>> {
    if !state.analysis.cancel(&request_id) {
        return Err(AppError::NotFound(format!(
            "No analysis in flight with id {}",
            request_id
        )));
    }
    tracing::info!(request_id = %request_id, "Analysis cancellation requested");
    Ok(Json(CancelResponse { cancelled: true }))
}
