// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal tracking: daily achievement, streaks and recommended targets.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::nutrition::NutritionAggregator;
use crate::models::{DateBucket, GoalType, Macros, MealRecord, UserGoal};

/// Lower edge of the "on target" band, as a fraction of the goal.
const ACHIEVEMENT_LOW: f64 = 0.8;
/// Upper edge of the "on target" band.
const ACHIEVEMENT_HIGH: f64 = 1.2;
/// How far back a streak is counted.
const STREAK_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GoalError {
    #[error("Invalid goal: {}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("Another goal is already active")]
    AlreadyActive,
}

/// Which targets a day's intake hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyAchievement {
    pub calories: bool,
    pub protein: bool,
    pub fat: bool,
    pub carbs: bool,
    pub fiber: bool,
    pub overall: bool,
}

impl DailyAchievement {
    pub fn evaluate(goal: &UserGoal, calories: f64, macros: &Macros) -> Self {
        let g = &goal.macro_goals;
        let calories = within_band(calories, goal.daily_calorie_goal);
        let protein = within_band(macros.protein, g.protein);
        let fat = within_band(macros.fat, g.fat);
        let carbs = within_band(macros.carbs, g.carbs);
        let fiber = within_band(macros.fiber, g.fiber);
        Self {
            calories,
            protein,
            fat,
            carbs,
            fiber,
            overall: calories && protein && fat && carbs && fiber,
        }
    }
}

fn within_band(actual: f64, goal: f64) -> bool {
    actual >= goal * ACHIEVEMENT_LOW && actual <= goal * ACHIEVEMENT_HIGH
}

/// Snapshot of how a goal is going as of one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal_id: String,
    pub as_of: NaiveDate,
    /// Percent of the goal's time span that has passed (0-100)
    pub time_progress: u32,
    pub total_days: u32,
    pub days_elapsed: u32,
    pub days_remaining: u32,
    pub today: DailyAchievement,
    /// Achieved days in a row ending yesterday
    pub consecutive_days: u32,
    /// Percent of checked days that were achieved
    pub achievement_rate: u32,
    pub average_daily_calories: f64,
}

/// Evaluates goals against meal records, bucketing days in `Tz`.
#[derive(Debug, Clone)]
pub struct GoalTracker<Tz: TimeZone = Utc> {
    aggregator: NutritionAggregator<Tz>,
}

impl<Tz: TimeZone> GoalTracker<Tz> {
    pub fn new(aggregator: NutritionAggregator<Tz>) -> Self {
        Self { aggregator }
    }

    pub fn daily_achievement(&self, goal: &UserGoal, bucket: &DateBucket<'_>) -> DailyAchievement {
        let macros: Macros = bucket.meals.iter().map(|m| m.total_macros()).sum();
        DailyAchievement::evaluate(goal, bucket.total_calories, &macros)
    }

    pub fn progress(&self, goal: &UserGoal, records: &[MealRecord], today: NaiveDate) -> GoalProgress {
        let total_days = days_between(goal.start_date, goal.target_date);
        let days_elapsed = days_between(goal.start_date, today);
        let days_remaining = days_between(today, goal.target_date);

        let time_progress = if today < goal.start_date {
            0
        } else if today >= goal.target_date || total_days == 0 {
            100
        } else {
            ((days_elapsed as f64 / total_days as f64) * 100.0)
                .round()
                .min(100.0) as u32
        };

        let today_bucket = self.aggregator.bucket_by_date_range(records, today, today);
        let today_achievement = today_bucket
            .first()
            .map(|b| self.daily_achievement(goal, b))
            .unwrap_or_default();

        // Streak counts back from yesterday so an unfinished day does not break it
        let consecutive_days = match today.pred_opt() {
            Some(yesterday) => {
                let window_start = yesterday
                    .checked_sub_days(Days::new(STREAK_WINDOW_DAYS - 1))
                    .map_or(goal.start_date, |d| d.max(goal.start_date));
                self.aggregator
                    .bucket_by_date_range(records, window_start, yesterday)
                    .iter()
                    .rev()
                    .take_while(|b| self.daily_achievement(goal, b).overall)
                    .count() as u32
            }
            None => 0,
        };

        let checked_end = today.min(goal.target_date);
        let report = self.aggregator.report(records, goal.start_date, checked_end);
        let achieved = report
            .buckets
            .iter()
            .filter(|b| self.daily_achievement(goal, b).overall)
            .count();
        let achievement_rate = if report.buckets.is_empty() {
            0
        } else {
            ((achieved as f64 / report.buckets.len() as f64) * 100.0).round() as u32
        };

        GoalProgress {
            goal_id: goal.id.clone(),
            as_of: today,
            time_progress,
            total_days,
            days_elapsed,
            days_remaining,
            today: today_achievement,
            consecutive_days,
            achievement_rate,
            average_daily_calories: report.summary.average_daily_calories,
        }
    }
}

fn days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    (to - from).num_days().max(0) as u32
}

// ─── Recommended targets ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    #[default]
    Sedentary,
    Light,
    Moderate,
    Heavy,
}

impl ActivityLevel {
    fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Heavy => 1.725,
        }
    }
}

/// Body measurements used to estimate energy needs.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Profile {
    #[validate(range(min = 20.0, max = 400.0))]
    pub weight_kg: f64,
    #[validate(range(min = 80.0, max = 260.0))]
    pub height_cm: f64,
    #[validate(range(min = 10, max = 120))]
    pub age: u32,
    pub sex: Sex,
    #[serde(default)]
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedTargets {
    pub daily_calories: f64,
    pub macros: Macros,
    pub bmr: f64,
    pub tdee: f64,
}

/// Mifflin-St Jeor BMR scaled by activity, adjusted for the goal, then split
/// into macro grams (4 kcal/g protein and carbs, 9 kcal/g fat).
pub fn recommend_targets(profile: &Profile, goal_type: GoalType) -> RecommendedTargets {
    let base = 10.0 * profile.weight_kg + 6.25 * profile.height_cm - 5.0 * profile.age as f64;
    let bmr = match profile.sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    };
    let tdee = bmr * profile.activity_level.multiplier();

    let daily_calories = match goal_type {
        GoalType::WeightLoss => tdee * 0.8,
        GoalType::MuscleGain => tdee * 1.15,
        GoalType::Maintain | GoalType::Health => tdee,
    }
    .round();

    let (protein_ratio, fat_ratio, carbs_ratio) = match goal_type {
        GoalType::WeightLoss => (0.35, 0.30, 0.35),
        GoalType::MuscleGain => (0.30, 0.25, 0.45),
        GoalType::Maintain | GoalType::Health => (0.25, 0.30, 0.45),
    };

    let macros = Macros::new(
        (daily_calories * protein_ratio / 4.0).round(),
        (daily_calories * fat_ratio / 9.0).round(),
        (daily_calories * carbs_ratio / 4.0).round(),
        (daily_calories / 1000.0 * 14.0).round(),
    );

    RecommendedTargets {
        daily_calories,
        macros,
        bmr: bmr.round(),
        tdee: tdee.round(),
    }
}
