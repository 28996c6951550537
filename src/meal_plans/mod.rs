pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use dto::{DayMeals, MealPlan};
pub use repo::{MealPlanRepo, MemoryMealPlanRepo, PgMealPlanRepo};

pub fn router() -> Router<AppState> {
    handlers::meal_plan_routes()
}
