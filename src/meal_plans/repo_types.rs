use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;

use super::dto::{MealPlan, MealPlanDetails};

/// Durable meal plan, unique per (session_id, week_start, week_end).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMealPlan {
    pub session_id: String,
    pub week_start: String,
    pub week_end: String,
    pub meals: MealPlan,
    pub ingredients: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct MealPlanRow {
    pub session_id: String,
    pub week_start: String,
    pub week_end: String,
    pub meals: Json<MealPlan>,
    pub ingredients: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<MealPlanRow> for StoredMealPlan {
    fn from(r: MealPlanRow) -> Self {
        Self {
            session_id: r.session_id,
            week_start: r.week_start,
            week_end: r.week_end,
            meals: r.meals.0,
            ingredients: r.ingredients,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<StoredMealPlan> for MealPlanDetails {
    fn from(p: StoredMealPlan) -> Self {
        Self {
            week_start: p.week_start,
            week_end: p.week_end,
            meals: p.meals,
            ingredients: p.ingredients,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}
