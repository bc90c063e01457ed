// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;
use crate::models::ApiErrorBody;
use crate::services::{GoalError, NormalizeError, VisionError};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Image(#[from] NormalizeError),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error(transparent)]
    Goal(#[from] GoalError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request body too large")]
    RequestTooLarge,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable wire code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Image(e) => e.code(),
            AppError::Vision(e) => e.code(),
            AppError::Goal(GoalError::Invalid(_)) => "INVALID_REQUEST",
            AppError::Goal(GoalError::AlreadyActive) => "CONFLICT",
            AppError::Store(_) => "STORAGE_ERROR",
            AppError::BadRequest(_) | AppError::Validation(_) => "INVALID_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RequestTooLarge => "REQUEST_TOO_LARGE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Image(e) => match e {
                NormalizeError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                NormalizeError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                NormalizeError::DecodeError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                NormalizeError::EncodeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Vision(e) => match e {
                VisionError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                VisionError::Network(_) | VisionError::AnalysisFailed(_) => StatusCode::BAD_GATEWAY,
                VisionError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                VisionError::ImageUnclear | VisionError::NotFood | VisionError::NoFoodDetected => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                VisionError::ApiKeyMissing => StatusCode::SERVICE_UNAVAILABLE,
                // nginx's "client closed request"
                VisionError::Cancelled => {
                    StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
                }
            },
            AppError::Goal(GoalError::Invalid(_)) => StatusCode::BAD_REQUEST,
            AppError::Goal(GoalError::AlreadyActive) | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: ApiErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "Storage error");
                "Failed to access stored data".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Internal server error".to_string()
            }
            AppError::Vision(VisionError::Network(detail) | VisionError::AnalysisFailed(detail)) => {
                tracing::warn!(error = %detail, code = self.code(), "Vision analysis failed");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error: ApiErrorBody {
                code: self.code().to_string(),
                message,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        let cases = [
            (
                AppError::from(NormalizeError::FileTooLarge { size: 2, limit: 1 }),
                "FILE_TOO_LARGE",
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::from(VisionError::RateLimited),
                "RATE_LIMIT_EXCEEDED",
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AppError::from(GoalError::AlreadyActive),
                "CONFLICT",
                StatusCode::CONFLICT,
            ),
            (
                AppError::NotFound("meal x".into()),
                "NOT_FOUND",
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::RequestTooLarge,
                "REQUEST_TOO_LARGE",
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
        }
        assert_eq!(AppError::from(VisionError::Cancelled).status().as_u16(), 499);
    }
}
