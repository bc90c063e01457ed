// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! SnapCal: calorie tracking from food photos
//!
//! This crate provides the backend API that normalizes uploaded meal
//! photos, asks a vision model what is on the plate, and aggregates logged
//! meals into daily and per-slot nutrition statistics.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use chrono::FixedOffset;
use config::Config;
use db::{Db, DirStore};
use services::{AnalysisService, GoalTracker, ImageNormalizer, NutritionAggregator, VisionClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub normalizer: ImageNormalizer,
    pub aggregator: NutritionAggregator<FixedOffset>,
    pub goal_tracker: GoalTracker<FixedOffset>,
    pub analysis: AnalysisService,
}

impl AppState {
    /// Build state from config, opening the directory store if one is set.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let db = match &config.data_dir {
            Some(dir) => Db::new(Arc::new(DirStore::open(dir)?)),
            None => {
                tracing::warn!("DATA_DIR not set, meals and goals are kept in memory only");
                Db::in_memory()
            }
        };
        let client = if config.use_mock {
            tracing::info!("Vision client running in mock mode");
            VisionClient::mock()
        } else {
            VisionClient::new(
                config.vision_endpoint.clone(),
                config.vision_api_key.clone(),
                config.vision_model.clone(),
            )
        };
        Ok(Self::new(config, db, client))
    }

    pub fn new(config: Config, db: Db, client: VisionClient) -> Self {
        let aggregator = NutritionAggregator::new(config.utc_offset);
        Self {
            normalizer: ImageNormalizer::new(config.image_policy()),
            goal_tracker: GoalTracker::new(aggregator.clone()),
            aggregator,
            analysis: AnalysisService::new(client, config.request_timeout, config.extended_timeout),
            db,
            config,
        }
    }
}
