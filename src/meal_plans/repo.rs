use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::dto::MealPlan;
use super::repo_types::{MealPlanRow, SaveOutcome, StoredMealPlan};

#[async_trait]
pub trait MealPlanRepo: Send + Sync {
    /// Insert-or-update keyed by session and week; `created_at` survives updates.
    async fn upsert(
        &self,
        session_id: &str,
        week_start: &str,
        week_end: &str,
        meals: &MealPlan,
        ingredients: &str,
    ) -> anyhow::Result<SaveOutcome>;

    async fn find(
        &self,
        session_id: &str,
        week_start: &str,
        week_end: &str,
    ) -> anyhow::Result<Option<StoredMealPlan>>;
}

#[derive(Clone)]
pub struct PgMealPlanRepo {
    db: PgPool,
}

impl PgMealPlanRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealPlanRepo for PgMealPlanRepo {
    async fn upsert(
        &self,
        session_id: &str,
        week_start: &str,
        week_end: &str,
        meals: &MealPlan,
        ingredients: &str,
    ) -> anyhow::Result<SaveOutcome> {
        // xmax is 0 only for a freshly inserted tuple
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO meal_plans (session_id, week_start, week_end, meals, ingredients)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id, week_start, week_end)
            DO UPDATE SET meals = EXCLUDED.meals,
                          ingredients = EXCLUDED.ingredients,
                          updated_at = now()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(session_id)
        .bind(week_start)
        .bind(week_end)
        .bind(Json(meals))
        .bind(ingredients)
        .fetch_one(&self.db)
        .await
        .context("upsert meal plan")?;

        Ok(if inserted {
            SaveOutcome::Created
        } else {
            SaveOutcome::Updated
        })
    }

    async fn find(
        &self,
        session_id: &str,
        week_start: &str,
        week_end: &str,
    ) -> anyhow::Result<Option<StoredMealPlan>> {
        let row = sqlx::query_as::<_, MealPlanRow>(
            r#"
            SELECT session_id, week_start, week_end, meals, ingredients, created_at, updated_at
            FROM meal_plans
            WHERE session_id = $1 AND week_start = $2 AND week_end = $3
            "#,
        )
        .bind(session_id)
        .bind(week_start)
        .bind(week_end)
        .fetch_optional(&self.db)
        .await
        .context("find meal plan")?;
        Ok(row.map(Into::into))
    }
}

type PlanKey = (String, String, String);

/// Process-local repository used when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryMealPlanRepo {
    plans: Arc<RwLock<HashMap<PlanKey, StoredMealPlan>>>,
}

impl MemoryMealPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MealPlanRepo for MemoryMealPlanRepo {
    async fn upsert(
        &self,
        session_id: &str,
        week_start: &str,
        week_end: &str,
        meals: &MealPlan,
        ingredients: &str,
    ) -> anyhow::Result<SaveOutcome> {
        let now = OffsetDateTime::now_utc();
        let key = (session_id.to_string(), week_start.to_string(), week_end.to_string());
        let mut plans = self.plans.write().await;
        let outcome = match plans.get_mut(&key) {
            Some(existing) => {
                existing.meals = meals.clone();
                existing.ingredients = ingredients.to_string();
                existing.updated_at = now;
                SaveOutcome::Updated
            }
            None => {
                plans.insert(
                    key,
                    StoredMealPlan {
                        session_id: session_id.to_string(),
                        week_start: week_start.to_string(),
                        week_end: week_end.to_string(),
                        meals: meals.clone(),
                        ingredients: ingredients.to_string(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                SaveOutcome::Created
            }
        };
        Ok(outcome)
    }

    async fn find(
        &self,
        session_id: &str,
        week_start: &str,
        week_end: &str,
    ) -> anyhow::Result<Option<StoredMealPlan>> {
        let key = (session_id.to_string(), week_start.to_string(), week_end.to_string());
        Ok(self.plans.read().await.get(&key).cloned())
    }
}
