// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vision model client for food recognition.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. Handles:
//! - Prompting the model for a strict JSON food list
//! - Extracting the JSON object from free-form model output
//! - Mapping "blurry" / "not food" answers and HTTP failures to error kinds

use crate::models::{AnalysisData, FoodItem};
use serde::Deserialize;
use std::time::Duration;

const PROMPT_TEMPLATE: &str = r#"Analyze the food in this image and answer with JSON only.

Rules:
- Blurry image -> {"foods":[],"confidence":"unclear"}
- Not food -> {"foods":[],"confidence":"not_food"}
- More than 8 kinds of food -> only the main 5-8

Format:
{"foods":[{"name":"food name","portion":"count + weight (e.g. 1 bowl, about 200 g)","ingredients":"ingredients","calories":number,"nutrition":{"protein":number,"fat":number,"carbs":number,"fiber":number}}],"confidence":"high/medium/low","notes":"health advice"}

Requirements:
- portion is required and includes count and weight
- nutrition reflects the actual portion, not a 100 g standard
- numbers use one decimal place
- notes cover strengths and weaknesses of the meal, who it suits, who should avoid it, and concrete advice, in 150-200 words"#;

/// Failures of a single analysis round-trip.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VisionError {
    #[error("Vision request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Vision API rate limit exceeded")]
    RateLimited,

    #[error("Image is too blurry to recognize")]
    ImageUnclear,

    #[error("Image does not show food")]
    NotFood,

    #[error("No food detected in image")]
    NoFoodDetected,

    #[error("Vision API key is not configured")]
    ApiKeyMissing,

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

impl VisionError {
    /// Stable wire code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            VisionError::Timeout => "REQUEST_TIMEOUT",
            VisionError::Network(_) => "NETWORK_ERROR",
            VisionError::RateLimited => "RATE_LIMIT_EXCEEDED",
            VisionError::ImageUnclear => "IMAGE_UNCLEAR",
            VisionError::NotFood => "NOT_FOOD",
            VisionError::NoFoodDetected => "NO_FOOD_DETECTED",
            VisionError::ApiKeyMissing => "API_KEY_MISSING",
            VisionError::AnalysisFailed(_) => "ANALYSIS_FAILED",
            VisionError::Cancelled => "ANALYSIS_CANCELLED",
        }
    }

    /// Only timeouts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VisionError::Timeout)
    }
}

impl From<reqwest::Error> for VisionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VisionError::Timeout
        } else if e.is_connect() || e.is_request() {
            VisionError::Network(e.to_string())
        } else {
            VisionError::AnalysisFailed(e.to_string())
        }
    }
}

/// Vision model client.
#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    mock: bool,
}

impl VisionClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            mock: false,
        }
    }

    /// A client that never touches the network and returns a canned result.
    pub fn mock() -> Self {
        let mut client = Self::new("http://localhost", None, "mock");
        client.mock = true;
        client
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    /// Analyze a base64 JPEG (plain or `data:` URL) within `timeout`.
    pub async fn analyze(&self, image: &str, timeout: Duration) -> Result<AnalysisData, VisionError> {
        if self.mock {
            return Ok(mock_analysis());
        }

        let api_key = self.api_key.as_deref().ok_or(VisionError::ApiKeyMissing)?;
        let payload = strip_data_url(image);

        let body = serde_json::json!({
            "model": self.model,
            "max_completion_tokens": 2000,
            "temperature": 0.5,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{}", payload) }
                    },
                    { "type": "text", "text": PROMPT_TEMPLATE }
                ]
            }]
        });

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(url = %url, payload_len = payload.len(), "Sending vision request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || text.contains("SetLimitExceeded") {
                tracing::warn!("Vision API rate limit hit (429)");
                return Err(VisionError::RateLimited);
            }
            tracing::warn!(status = status.as_u16(), body = %text, "Vision API error");
            return Err(VisionError::AnalysisFailed(format!("HTTP {}", status)));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VisionError::AnalysisFailed("No content in response".to_string()))?;

        parse_model_output(&content)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The JSON object the prompt asks for.
#[derive(Deserialize)]
struct ModelOutput {
    foods: Vec<FoodItem>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// Drop a `data:image/...;base64,` prefix if present.
pub fn strip_data_url(image: &str) -> &str {
    if image.starts_with("data:") {
        if let Some(idx) = image.find(";base64,") {
            return &image[idx + ";base64,".len()..];
        }
    }
    image
}

/// Parse the model's free-form answer into analysis data.
pub fn parse_model_output(content: &str) -> Result<AnalysisData, VisionError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &content[s..=e],
        _ => {
            return Err(VisionError::AnalysisFailed(
                "No JSON found in response".to_string(),
            ))
        }
    };

    let output: ModelOutput = serde_json::from_str(json)
        .map_err(|e| VisionError::AnalysisFailed(format!("Invalid response format: {}", e)))?;

    if output.foods.is_empty() {
        return Err(match output.confidence.as_deref() {
            Some("unclear") => VisionError::ImageUnclear,
            Some("not_food") => VisionError::NotFood,
            _ => VisionError::NoFoodDetected,
        });
    }

    if let Some(bad) = output.foods.iter().find(|f| !f.is_valid()) {
        return Err(VisionError::AnalysisFailed(format!(
            "Invalid food entry: {}",
            bad.name
        )));
    }

    Ok(AnalysisData::new(
        output.foods,
        output.confidence,
        output.notes,
    ))
}

fn mock_analysis() -> AnalysisData {
    use crate::models::Macros;

    AnalysisData::new(
        vec![
            FoodItem::new("Steamed rice", 232.0, Macros::new(4.3, 0.5, 51.0, 0.6))
                .with_portion("1 bowl, about 200 g"),
            FoodItem::new("Stir-fried broccoli", 85.5, Macros::new(4.2, 5.1, 7.3, 3.9))
                .with_portion("1 plate, about 150 g"),
        ],
        Some("high".to_string()),
        Some("Balanced plate; add a protein source.".to_string()),
    )
}
