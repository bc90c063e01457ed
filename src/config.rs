//! Application configuration loaded from environment variables.

use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::ImagePolicy;
use crate::time_utils::parse_utc_offset;

const DEFAULT_VISION_ENDPOINT: &str = "https://ark.cn-beijing.volces.com/api/v3";
const DEFAULT_VISION_MODEL: &str = "doubao-seed-1-6-251015";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,

    // --- Vision model ---
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`)
    pub vision_endpoint: String,
    /// Bearer key; analysis fails with API_KEY_MISSING when unset
    pub vision_api_key: Option<String>,
    pub vision_model: String,
    /// Return canned analyses instead of calling the model
    pub use_mock: bool,
    /// First attempt deadline
    pub request_timeout: Duration,
    /// Deadline for the single retry after a timeout
    pub extended_timeout: Duration,

    // --- Images ---
    /// Largest accepted upload, also the HTTP body limit
    pub max_upload_bytes: usize,

    // --- Storage and dates ---
    /// Offset used to decide which calendar day a meal belongs to
    pub utc_offset: FixedOffset,
    /// Directory for the JSON store; in-memory when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            vision_api_key: None,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            use_mock: true,
            request_timeout: Duration::from_secs(60),
            extended_timeout: Duration::from_secs(120),
            max_upload_bytes: ImagePolicy::default().max_input_bytes,
            utc_offset: Utc.fix(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        let utc_offset = match env::var("UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw).ok_or(ConfigError::Invalid("UTC_OFFSET", raw))?,
            Err(_) => defaults.utc_offset,
        };

        Ok(Self {
            port: parse_or("PORT", defaults.port)?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            vision_endpoint: env::var("VISION_API_ENDPOINT").unwrap_or(defaults.vision_endpoint),
            vision_api_key: env::var("VISION_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            vision_model: env::var("VISION_MODEL").unwrap_or(defaults.vision_model),
            use_mock: env::var("USE_MOCK")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 60u64)?),
            extended_timeout: Duration::from_secs(parse_or("EXTENDED_TIMEOUT_SECS", 120u64)?),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            utc_offset,
            data_dir: env::var("DATA_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Image policy with the configured upload ceiling.
    pub fn image_policy(&self) -> ImagePolicy {
        ImagePolicy {
            max_input_bytes: self.max_upload_bytes,
            ..ImagePolicy::default()
        }
    }

    /// Body limit for JSON endpoints: a base64 upload plus some headroom.
    pub fn json_body_limit(&self) -> usize {
        self.max_upload_bytes / 3 * 4 + 64 * 1024
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
