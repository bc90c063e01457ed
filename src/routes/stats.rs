// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nutrition statistics routes.

use crate::error::{AppError, Result};
use crate::models::{RangeSummary, SlotCalories, SlotPercentages};
use crate::routes::{query_params, today};
use crate::time_utils::{day_count, Period};
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest range a single stats request may cover.
const MAX_RANGE_DAYS: u32 = 366;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stats/daily", get(get_daily))
        .route("/api/stats/summary", get(get_summary))
        .route("/api/stats/distribution", get(get_distribution))
}

/// Either an explicit `start`/`end`, or a `period` ending on `date`
/// (default: a week ending today).
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub period: Option<Period>,
    pub date: Option<NaiveDate>,
}

impl RangeQuery {
    fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            (None, None) => self
                .period
                .unwrap_or(Period::Week)
                .range_ending(self.date.unwrap_or(today))
                .ok_or_else(|| AppError::BadRequest("date is out of range".to_string()))?,
            _ => {
                return Err(AppError::BadRequest(
                    "start and end must be given together".to_string(),
                ))
            }
        };
        if start > end {
            return Err(AppError::BadRequest("start must not be after end".to_string()));
        }
        if day_count(start, end) > MAX_RANGE_DAYS {
            return Err(AppError::BadRequest(format!(
                "range may cover at most {} days",
                MAX_RANGE_DAYS
            )));
        }
        Ok((start, end))
    }
}

/// Daily buckets for the range, including empty days.
async fn get_daily(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Response> {
    let query = query_params(query)?;
    let (start, end) = query.resolve(today(&state))?;
    let records = state.db.list_meals().await?;
    let buckets = state.aggregator.bucket_by_date_range(&records, start, end);

    // Buckets borrow the records, so serialize before they go out of scope
    Ok(Json(&buckets).into_response())
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DistributionResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub calories: SlotCalories,
    pub percentages: SlotPercentages,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub summary: RangeSummary,
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<SummaryResponse>> {
    let query = query_params(query)?;
    let (start, end) = query.resolve(today(&state))?;
    let records = state.db.list_meals().await?;
    let report = state.aggregator.report(&records, start, end);

    tracing::debug!(
        %start,
        %end,
        meals = report.summary.meal_count,
        total_calories = report.summary.total_calories,
        "Computed range summary"
    );

    Ok(Json(SummaryResponse {
        start,
        end,
        summary: report.summary,
    }))
}

async fn get_distribution(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<DistributionResponse>> {
    let query = query_params(query)?;
    let (start, end) = query.resolve(today(&state))?;
    let records = state.db.list_meals().await?;
    let calories = state.aggregator.report(&records, start, end).summary.calories_by_slot;

    Ok(Json(DistributionResponse {
        start,
        end,
        calories,
        percentages: calories.percentages(),
    }))
}
