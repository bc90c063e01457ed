// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request/response shapes for food photo analysis.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::meal::{sum_tenths, FoodItem};

/// Client request to analyze a food photo.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalyzeRequest {
    /// Base64 JPEG payload, optionally as a `data:` URL
    #[validate(length(min = 1))]
    pub image: String,
    /// Image format label, e.g. "jpeg"
    #[serde(default = "default_format")]
    #[validate(length(max = 16))]
    pub format: String,
    /// Caller-chosen id used to cancel the request while it is in flight
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub request_id: Option<String>,
}

fn default_format() -> String {
    "jpeg".to_string()
}

/// Parsed food list returned by the vision model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    pub foods: Vec<FoodItem>,
    pub total_calories: f64,
    /// Model's own confidence label: "high", "medium" or "low"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    /// Dietary notes from the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AnalysisData {
    pub fn new(foods: Vec<FoodItem>, confidence: Option<String>, notes: Option<String>) -> Self {
        let total_calories = sum_tenths(foods.iter().map(|f| f.calories));
        Self {
            foods,
            total_calories,
            confidence,
            notes,
        }
    }
}

/// Wire error body shared by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// Envelope returned by `/api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

impl AnalyzeResponse {
    pub fn ok(data: AnalysisData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
