// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meal log routes.

use crate::error::{AppError, Result};
use crate::models::meal::{MAX_FOOD_CALORIES, MAX_MACRO_GRAMS};
use crate::models::{FoodItem, MealRecord, MealSlot};
use crate::routes::{json_body, query_params};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meals", get(list_meals).post(create_meal))
        .route(
            "/api/meals/{id}",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
}

/// Meal with its derived calorie total.
#[derive(Serialize)]
pub struct MealResponse {
    #[serde(flatten)]
    pub meal: MealRecord,
    pub total_calories: f64,
}

impl From<MealRecord> for MealResponse {
    fn from(meal: MealRecord) -> Self {
        Self {
            total_calories: meal.calories(),
            meal,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMealRequest {
    pub meal_slot: MealSlot,
    /// Defaults to now
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 50))]
    pub foods: Vec<FoodItem>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMealRequest {
    #[serde(default)]
    pub meal_slot: Option<MealSlot>,
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(min = 1, max = 50))]
    pub foods: Option<Vec<FoodItem>>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListMealsQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub slot: Option<MealSlot>,
}

fn check_foods(foods: &[FoodItem]) -> Result<()> {
    match foods.iter().find(|f| !f.is_valid()) {
        Some(bad) => Err(AppError::BadRequest(format!(
            "food {:?} has invalid nutrition values (calories 0-{}, macros 0-{} g)",
            bad.name, MAX_FOOD_CALORIES, MAX_MACRO_GRAMS
        ))),
        None => Ok(()),
    }
}

/// List meals, optionally filtered by local date range and slot.
async fn list_meals(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ListMealsQuery>, QueryRejection>,
) -> Result<Json<Vec<MealResponse>>> {
    let query = query_params(query)?;
    if let (Some(start), Some(end)) = (query.start, query.end) {
        if start > end {
            return Err(AppError::BadRequest("start must not be after end".to_string()));
        }
    }

    let mut meals: Vec<MealRecord> = state
        .db
        .list_meals()
        .await?
        .into_iter()
        .filter(|m| {
            let day = state.aggregator.day_of(m);
            query.start.map_or(true, |s| day >= s)
                && query.end.map_or(true, |e| day <= e)
                && query.slot.map_or(true, |slot| m.meal_slot == slot)
        })
        .collect();
    meals.sort_by(|a, b| {
        a.consumed_at
            .cmp(&b.consumed_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(Json(meals.into_iter().map(MealResponse::from).collect()))
}

async fn create_meal(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateMealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MealResponse>)> {
    let request = json_body(body)?;
    request.validate()?;
    check_foods(&request.foods)?;

    let now = Utc::now();
    let mut meal = MealRecord::new(
        uuid::Uuid::new_v4().to_string(),
        request.meal_slot,
        request.consumed_at.unwrap_or(now),
        request.foods,
        now,
    );
    meal.notes = request.notes;

    let meal = state.db.insert_meal(meal).await?;
    tracing::info!(
        meal_id = %meal.id,
        slot = %meal.meal_slot,
        calories = meal.calories(),
        "Meal logged"
    );

    Ok((StatusCode::CREATED, Json(meal.into())))
}

async fn get_meal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MealResponse>> {
    let meal = state
        .db
        .get_meal(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meal {} not found", id)))?;
    Ok(Json(meal.into()))
}

/// Replace any of slot, time, foods or notes. Totals are recomputed.
async fn update_meal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<UpdateMealRequest>, JsonRejection>,
) -> Result<Json<MealResponse>> {
    let request = json_body(body)?;
    request.validate()?;
    if let Some(foods) = &request.foods {
        check_foods(foods)?;
    }

    let now = Utc::now();
    let meal = state
        .db
        .update_meal(&id, |meal| {
            if let Some(slot) = request.meal_slot {
                meal.meal_slot = slot;
            }
            if let Some(at) = request.consumed_at {
                meal.consumed_at = at;
            }
            if let Some(notes) = request.notes {
                meal.notes = Some(notes);
            }
            match request.foods {
                Some(foods) => meal.set_foods(foods, now),
                None => meal.updated_at = now,
            }
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meal {} not found", id)))?;

    tracing::info!(meal_id = %meal.id, calories = meal.calories(), "Meal updated");
    Ok(Json(meal.into()))
}

async fn delete_meal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_meal(&id).await? {
        return Err(AppError::NotFound(format!("Meal {} not found", id)));
    }
    tracing::info!(meal_id = %id, "Meal deleted");
    Ok(StatusCode::NO_CONTENT)
}
