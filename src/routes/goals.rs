// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nutrition goal routes.

use crate::error::{AppError, Result};
use crate::models::{GoalStatus, GoalType, Macros, UserGoal};
use crate::routes::{json_body, query_params, today};
use crate::services::{recommend_targets, GoalProgress, Profile, RecommendedTargets};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route("/api/goals/active", get(get_active_goal))
        .route("/api/goals/recommend", post(recommend))
        .route("/api/goals/{id}", delete(delete_goal))
        .route("/api/goals/{id}/status", put(set_status))
        .route("/api/goals/{id}/progress", get(get_progress))
}

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub goal_type: GoalType,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    #[serde(default)]
    pub current_weight: Option<f64>,
    #[serde(default)]
    pub target_weight: Option<f64>,
    pub daily_calorie_goal: f64,
    pub macro_goals: Macros,
    #[serde(default)]
    pub status: GoalStatus,
}

async fn list_goals(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserGoal>>> {
    Ok(Json(state.db.list_goals().await?))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateGoalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserGoal>)> {
    let request = json_body(body)?;
    let goal = UserGoal {
        id: uuid::Uuid::new_v4().to_string(),
        goal_type: request.goal_type,
        start_date: request.start_date,
        target_date: request.target_date,
        current_weight: request.current_weight,
        target_weight: request.target_weight,
        daily_calorie_goal: request.daily_calorie_goal,
        macro_goals: request.macro_goals,
        status: request.status,
    };
    let goal = state.db.create_goal(goal).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

/// The active goal, or `null` when none is active.
async fn get_active_goal(State(state): State<Arc<AppState>>) -> Result<Json<Option<UserGoal>>> {
    Ok(Json(state.db.active_goal().await?))
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.db.delete_goal(&id).await? {
        return Err(AppError::NotFound(format!("Goal {} not found", id)));
    }
    tracing::info!(goal_id = %id, "Goal deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: GoalStatus,
}

/// Pause, resume or complete a goal.
async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<UserGoal>> {
    let request = json_body(body)?;
    let goal = state
        .db
        .set_goal_status(&id, request.status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", id)))?;
    tracing::info!(goal_id = %id, status = ?goal.status, "Goal status changed");
    Ok(Json(goal))
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    /// Day to evaluate; defaults to today
    pub date: Option<NaiveDate>,
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<Json<GoalProgress>> {
    let query = query_params(query)?;
    let goal = state
        .db
        .get_goal(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", id)))?;
    let records = state.db.list_meals().await?;
    let as_of = query.date.unwrap_or_else(|| today(&state));
    Ok(Json(state.goal_tracker.progress(&goal, &records, as_of)))
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(default = "default_goal_type")]
    pub goal_type: GoalType,
}

fn default_goal_type() -> GoalType {
    GoalType::Health
}

/// Suggested daily calorie and macro targets for a body profile.
async fn recommend(
    body: std::result::Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendedTargets>> {
    let request = json_body(body)?;
    request.profile.validate()?;
    Ok(Json(recommend_targets(&request.profile, request.goal_type)))
}
