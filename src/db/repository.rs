// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed meal and goal operations over a [`KeyValueStore`].
//!
//! Each collection is one JSON array under its own key. Writes take a
//! process-wide lock so concurrent read-modify-write cycles don't lose
//! updates. Store calls may touch the filesystem, so they run on the
//! blocking thread pool.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::collections;
use super::store::{KeyValueStore, MemoryStore, StoreError};
use crate::error::{AppError, Result};
use crate::models::{GoalStatus, MealRecord, UserGoal};
use crate::services::GoalError;

/// Database handle shared through `AppState`.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Db {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Fresh in-memory database, used by tests and when no data dir is set.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Run a blocking store call on tokio's blocking pool.
    async fn blocking<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&dyn KeyValueStore) -> std::result::Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| anyhow::anyhow!("storage task failed: {}", e))?;
        Ok(result?)
    }

    async fn load<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>> {
        match self.blocking(move |store| store.get(key)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(StoreError::from)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save<T: Serialize>(&self, key: &'static str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items).map_err(StoreError::from)?;
        self.blocking(move |store| store.put(key, &raw)).await
    }

    // ─── Meal Operations ─────────────────────────────────────────

    pub async fn list_meals(&self) -> Result<Vec<MealRecord>> {
        self.load(collections::MEALS).await
    }

    pub async fn get_meal(&self, id: &str) -> Result<Option<MealRecord>> {
        let meals: Vec<MealRecord> = self.load(collections::MEALS).await?;
        Ok(meals.into_iter().find(|m| m.id == id))
    }

    /// Insert a new meal. Fails with a conflict if the id is taken.
    pub async fn insert_meal(&self, meal: MealRecord) -> Result<MealRecord> {
        let _guard = self.write_lock.lock().await;
        let mut meals: Vec<MealRecord> = self.load(collections::MEALS).await?;
        if meals.iter().any(|m| m.id == meal.id) {
            return Err(AppError::Conflict(format!("meal {} already exists", meal.id)));
        }
        meals.push(meal.clone());
        self.save(collections::MEALS, &meals).await?;
        tracing::debug!(meal_id = %meal.id, count = meals.len(), "Meal stored");
        Ok(meal)
    }

    /// Apply `change` to the meal with `id` and persist it.
    pub async fn update_meal<F>(&self, id: &str, change: F) -> Result<Option<MealRecord>>
    where
        F: FnOnce(&mut MealRecord),
    {
        let _guard = self.write_lock.lock().await;
        let mut meals: Vec<MealRecord> = self.load(collections::MEALS).await?;
        let Some(meal) = meals.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        change(meal);
        let updated = meal.clone();
        self.save(collections::MEALS, &meals).await?;
        Ok(Some(updated))
    }

    pub async fn delete_meal(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut meals: Vec<MealRecord> = self.load(collections::MEALS).await?;
        let before = meals.len();
        meals.retain(|m| m.id != id);
        if meals.len() == before {
            return Ok(false);
        }
        self.save(collections::MEALS, &meals).await?;
        Ok(true)
    }

    // ─── Goal Operations ─────────────────────────────────────────

    pub async fn list_goals(&self) -> Result<Vec<UserGoal>> {
        self.load(collections::GOALS).await
    }

    pub async fn get_goal(&self, id: &str) -> Result<Option<UserGoal>> {
        let goals: Vec<UserGoal> = self.load(collections::GOALS).await?;
        Ok(goals.into_iter().find(|g| g.id == id))
    }

    pub async fn active_goal(&self) -> Result<Option<UserGoal>> {
        let goals: Vec<UserGoal> = self.load(collections::GOALS).await?;
        Ok(goals.into_iter().find(|g| g.status == GoalStatus::Active))
    }

    /// Validate and store a new goal. At most one goal may be active.
    pub async fn create_goal(&self, goal: UserGoal) -> Result<UserGoal> {
        goal.validate().map_err(GoalError::Invalid)?;

        let _guard = self.write_lock.lock().await;
        let mut goals: Vec<UserGoal> = self.load(collections::GOALS).await?;
        if goal.status == GoalStatus::Active
            && goals.iter().any(|g| g.status == GoalStatus::Active)
        {
            return Err(GoalError::AlreadyActive.into());
        }
        if goals.iter().any(|g| g.id == goal.id) {
            return Err(AppError::Conflict(format!("goal {} already exists", goal.id)));
        }
        goals.push(goal.clone());
        self.save(collections::GOALS, &goals).await?;
        tracing::info!(goal_id = %goal.id, goal_type = ?goal.goal_type, "Goal created");
        Ok(goal)
    }

    /// Change a goal's status. Activating fails while another goal is active.
    pub async fn set_goal_status(&self, id: &str, status: GoalStatus) -> Result<Option<UserGoal>> {
        let _guard = self.write_lock.lock().await;
        let mut goals: Vec<UserGoal> = self.load(collections::GOALS).await?;
        if status == GoalStatus::Active
            && goals
                .iter()
                .any(|g| g.status == GoalStatus::Active && g.id != id)
        {
            return Err(GoalError::AlreadyActive.into());
        }
        let Some(goal) = goals.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        goal.status = status;
        let updated = goal.clone();
        self.save(collections::GOALS, &goals).await?;
        Ok(Some(updated))
    }

    pub async fn delete_goal(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut goals: Vec<UserGoal> = self.load(collections::GOALS).await?;
        let before = goals.len();
        goals.retain(|g| g.id != id);
        if goals.len() == before {
            return Ok(false);
        }
        self.save(collections::GOALS, &goals).await?;
        Ok(true)
    }
}
