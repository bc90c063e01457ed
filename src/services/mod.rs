// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod analysis;
pub mod exif;
pub mod goals;
pub mod image;
pub mod nutrition;
pub mod vision;

pub use analysis::{AnalysisService, CancellationToken};
pub use goals::{
    recommend_targets, DailyAchievement, GoalError, GoalProgress, GoalTracker, Profile,
    RecommendedTargets,
};
pub use image::{ImageNormalizer, ImagePolicy, NormalizeError, NormalizedImage, RawImageInput};
pub use nutrition::NutritionAggregator;
pub use vision::{VisionClient, VisionError};
