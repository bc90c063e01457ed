// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nutrition goals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::meal::Macros;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    WeightLoss,
    MuscleGain,
    Maintain,
    Health,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
}

/// Stored goal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGoal {
    pub id: String,
    pub goal_type: GoalType,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    /// Body weight in kg
    #[serde(default)]
    pub current_weight: Option<f64>,
    #[serde(default)]
    pub target_weight: Option<f64>,
    pub daily_calorie_goal: f64,
    pub macro_goals: Macros,
    #[serde(default)]
    pub status: GoalStatus,
}

impl UserGoal {
    /// Check the goal for internal consistency.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.daily_calorie_goal.is_finite() && self.daily_calorie_goal > 0.0) {
            errors.push("daily calorie goal must be greater than 0".to_string());
        }

        let m = &self.macro_goals;
        for (name, value) in [
            ("protein", m.protein),
            ("fat", m.fat),
            ("carbs", m.carbs),
            ("fiber", m.fiber),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!("{} goal must not be negative", name));
            }
        }

        if self.target_date <= self.start_date {
            errors.push("target date must be after start date".to_string());
        }

        if matches!(self.goal_type, GoalType::WeightLoss | GoalType::MuscleGain) {
            let current = self.current_weight.filter(|w| *w > 0.0);
            let target = self.target_weight.filter(|w| *w > 0.0);
            if current.is_none() {
                errors.push("current weight must be greater than 0".to_string());
            }
            if target.is_none() {
                errors.push("target weight must be greater than 0".to_string());
            }
            if let (Some(current), Some(target)) = (current, target) {
                if self.goal_type == GoalType::WeightLoss && target >= current {
                    errors.push("weight loss target must be below current weight".to_string());
                }
                if self.goal_type == GoalType::MuscleGain && target <= current {
                    errors.push("muscle gain target must be above current weight".to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
