// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SnapCal API Server
//!
//! Normalizes meal photos, runs them through a vision model for food
//! recognition, and serves meal logs, statistics and goal progress.

use snapcal::{config::Config, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        mock = config.use_mock,
        model = %config.vision_model,
        utc_offset = %config.utc_offset,
        "Starting SnapCal API"
    );
    if !config.use_mock && config.vision_api_key.is_none() {
        tracing::warn!("VISION_API_KEY not set, analysis requests will fail");
    }

    // Build shared state
    let state = Arc::new(AppState::from_config(config.clone())?);

    // Build router
    let app = snapcal::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("snapcal=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
