// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod analysis;
pub mod goal;
pub mod meal;
pub mod stats;

pub use analysis::{AnalysisData, AnalyzeRequest, AnalyzeResponse, ApiErrorBody};
pub use goal::{GoalStatus, GoalType, UserGoal};
pub use meal::{FoodItem, Macros, MealRecord, MealSlot};
pub use stats::{DateBucket, RangeReport, RangeSummary, SlotCalories, SlotPercentages};
