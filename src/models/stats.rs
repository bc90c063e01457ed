// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nutrition aggregates computed on demand for the analytics views.
//!
//! Nothing here is persisted; see `services::nutrition` for how these are
//! produced from meal records.

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::meal::{from_tenths, Macros, MealRecord, MealSlot};

/// All meals eaten on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateBucket<'a> {
    pub date: NaiveDate,
    pub total_calories: f64,
    /// Meals ordered by consumption time
    pub meals: Vec<&'a MealRecord>,
}

/// Calorie totals per meal slot. Every slot is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SlotCalories {
    pub breakfast: f64,
    pub lunch: f64,
    pub dinner: f64,
    pub snack: f64,
}

impl SlotCalories {
    /// Build from per-slot totals in tenths, indexed by `MealSlot::index`.
    pub(crate) fn from_tenths(tenths: [i64; 4]) -> Self {
        Self {
            breakfast: from_tenths(tenths[0]),
            lunch: from_tenths(tenths[1]),
            dinner: from_tenths(tenths[2]),
            snack: from_tenths(tenths[3]),
        }
    }

    pub fn get(&self, slot: MealSlot) -> f64 {
        match slot {
            MealSlot::Breakfast => self.breakfast,
            MealSlot::Lunch => self.lunch,
            MealSlot::Dinner => self.dinner,
            MealSlot::Snack => self.snack,
        }
    }

    pub fn total(&self) -> f64 {
        crate::models::meal::sum_tenths(MealSlot::ALL.iter().map(|s| self.get(*s)))
    }

    /// Share of each slot in whole percent, rounded to nearest.
    /// All zeros when nothing was eaten.
    pub fn percentages(&self) -> SlotPercentages {
        let total = self.total();
        if total <= 0.0 {
            return SlotPercentages::default();
        }
        let pct = |value: f64| ((value / total) * 100.0 + 0.5).floor() as u32;
        SlotPercentages {
            breakfast: pct(self.breakfast),
            lunch: pct(self.lunch),
            dinner: pct(self.dinner),
            snack: pct(self.snack),
        }
    }
}

/// Per-slot share of calories in whole percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SlotPercentages {
    pub breakfast: u32,
    pub lunch: u32,
    pub dinner: u32,
    pub snack: u32,
}

/// Range-level nutrition summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSummary {
    pub day_count: u32,
    pub meal_count: usize,
    pub total_calories: f64,
    /// `total_calories / day_count`, one decimal; 0 for an empty range
    pub average_daily_calories: f64,
    pub average_macros: Macros,
    pub calories_by_slot: SlotCalories,
}

impl RangeSummary {
    pub fn empty() -> Self {
        Self {
            day_count: 0,
            meal_count: 0,
            total_calories: 0.0,
            average_daily_calories: 0.0,
            average_macros: Macros::ZERO,
            calories_by_slot: SlotCalories::default(),
        }
    }
}

/// Daily buckets plus the summary of the same records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport<'a> {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub buckets: Vec<DateBucket<'a>>,
    pub summary: RangeSummary,
}
