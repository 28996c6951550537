use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::dto::{GetMealPlanQuery, GetMealPlanResponse, SaveMealPlanRequest, SaveMealPlanResponse};
use super::repo_types::SaveOutcome;
use crate::{
    error::{ApiError, ApiJson},
    state::AppState,
};

pub fn meal_plan_routes() -> Router<AppState> {
    Router::new()
        .route("/save-meal-plan", post(save_meal_plan))
        .route("/get-meal-plan", get(get_meal_plan))
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[instrument(skip(state, payload))]
pub async fn save_meal_plan(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SaveMealPlanRequest>,
) -> Result<Json<SaveMealPlanResponse>, ApiError> {
    let (Some(session_id), Some(week_start), Some(week_end), Some(meals)) = (
        present(payload.session_id),
        present(payload.week_start),
        present(payload.week_end),
        payload.meals,
    ) else {
        warn!("save-meal-plan missing required fields");
        return Err(ApiError::BadRequest(
            "Missing required fields: sessionId, weekStart, weekEnd and meals".into(),
        ));
    };
    let ingredients = payload.ingredients.unwrap_or_default();

    let outcome = state
        .plans
        .upsert(&session_id, &week_start, &week_end, &meals, &ingredients)
        .await
        .map_err(|e| {
            error!(error = %e, %session_id, "save meal plan failed");
            ApiError::internal("Failed to save meal plan", format!("{e:#}"))
        })?;

    info!(%session_id, %week_start, %week_end, ?outcome, "meal plan stored");
    let message = match outcome {
        SaveOutcome::Created => "Meal plan saved",
        SaveOutcome::Updated => "Meal plan updated",
    };
    Ok(Json(SaveMealPlanResponse {
        success: true,
        message: message.into(),
        week_start,
        week_end,
    }))
}

#[instrument(skip(state))]
pub async fn get_meal_plan(
    State(state): State<AppState>,
    Query(q): Query<GetMealPlanQuery>,
) -> Result<Json<GetMealPlanResponse>, ApiError> {
    let (Some(session_id), Some(week_start), Some(week_end)) =
        (present(q.session_id), present(q.week_start), present(q.week_end))
    else {
        return Err(ApiError::BadRequest(
            "Missing sessionId, weekStart or weekEnd parameters".into(),
        ));
    };

    let plan = state
        .plans
        .find(&session_id, &week_start, &week_end)
        .await
        .map_err(|e| {
            error!(error = %e, %session_id, "get meal plan failed");
            ApiError::internal("Failed to get meal plan", format!("{e:#}"))
        })?
        .ok_or_else(|| ApiError::NotFound("Meal plan not found".into()))?;

    Ok(Json(GetMealPlanResponse {
        success: true,
        meal_plan: plan.into(),
    }))
}
