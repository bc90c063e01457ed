// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date-bucketed nutrition aggregation.
//!
//! All sums run on integer tenths, so results are identical for any
//! ordering of the input records.

use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::models::meal::{add_tenths, from_tenths, round1, Macros, MealRecord};
use crate::models::stats::{DateBucket, RangeReport, RangeSummary, SlotCalories};
use crate::time_utils::{day_count, days_inclusive, local_day};

/// Aggregates meal records by calendar day in time zone `Tz`.
#[derive(Debug, Clone)]
pub struct NutritionAggregator<Tz: TimeZone = Utc> {
    tz: Tz,
}

impl Default for NutritionAggregator<Utc> {
    fn default() -> Self {
        Self { tz: Utc }
    }
}

impl<Tz: TimeZone> NutritionAggregator<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Local calendar day a record belongs to.
    pub fn day_of(&self, record: &MealRecord) -> NaiveDate {
        local_day(&record.consumed_at, &self.tz)
    }

    /// One bucket per day from `start` to `end` inclusive, ascending.
    ///
    /// Days without meals get an empty bucket. Records outside the range are
    /// skipped. Meals within a bucket are ordered by time, then id.
    pub fn bucket_by_date_range<'a>(
        &self,
        records: &'a [MealRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DateBucket<'a>> {
        let mut by_day: BTreeMap<NaiveDate, Vec<&'a MealRecord>> = BTreeMap::new();
        for record in records {
            let day = self.day_of(record);
            if day >= start && day <= end {
                by_day.entry(day).or_default().push(record);
            }
        }

        days_inclusive(start, end)
            .map(|date| {
                let mut meals = by_day.remove(&date).unwrap_or_default();
                meals.sort_by(|a, b| {
                    a.consumed_at
                        .cmp(&b.consumed_at)
                        .then_with(|| a.id.cmp(&b.id))
                });
                let total = add_tenths(meals.iter().map(|m| m.calories_tenths()));
                DateBucket {
                    date,
                    total_calories: from_tenths(total),
                    meals,
                }
            })
            .collect()
    }

    /// Summarize `records` as if they span `day_count` days.
    pub fn summarize(&self, records: &[MealRecord], day_count: u32) -> RangeSummary {
        summarize(records.iter(), day_count)
    }

    /// Calories per meal slot; every slot present.
    pub fn distribution_by_slot(&self, records: &[MealRecord]) -> SlotCalories {
        distribution_by_slot(records.iter())
    }

    /// Buckets for the range plus a summary of exactly the bucketed records.
    pub fn report<'a>(
        &self,
        records: &'a [MealRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> RangeReport<'a> {
        let buckets = self.bucket_by_date_range(records, start, end);
        let summary = summarize(
            buckets.iter().flat_map(|b| b.meals.iter().copied()),
            day_count(start, end),
        );
        RangeReport {
            start,
            end,
            buckets,
            summary,
        }
    }
}

fn summarize<'a, I>(records: I, day_count: u32) -> RangeSummary
where
    I: Iterator<Item = &'a MealRecord> + Clone,
{
    let meal_count = records.clone().count();
    let total_tenths = add_tenths(records.clone().map(|m| m.calories_tenths()));
    let total_macros: Macros = records.clone().map(|m| m.total_macros()).sum();
    let total_calories = from_tenths(total_tenths);

    let average_daily_calories = if day_count == 0 {
        0.0
    } else {
        round1(total_calories / day_count as f64)
    };

    RangeSummary {
        day_count,
        meal_count,
        total_calories,
        average_daily_calories,
        average_macros: total_macros.average_over(day_count),
        calories_by_slot: distribution_by_slot(records),
    }
}

fn distribution_by_slot<'a, I>(records: I) -> SlotCalories
where
    I: Iterator<Item = &'a MealRecord>,
{
    let mut tenths = [0i64; 4];
    for record in records {
        let slot = &mut tenths[record.meal_slot.index()];
        *slot = slot.saturating_add(record.calories_tenths());
    }
    SlotCalories::from_tenths(tenths)
}
