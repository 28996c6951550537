use axum::{extract::State, routing::post, Json, Router};
use tracing::{error, instrument, warn};

use super::dto::{ComputeNutritionRequest, NutritionSummary};
use super::services::{compute_nutrition as summarize, NutritionError};
use crate::ai::preference;
use crate::{
    error::{ApiError, ApiJson},
    state::AppState,
};

pub fn nutrition_routes() -> Router<AppState> {
    Router::new().route("/compute-nutrition", post(compute_nutrition))
}

#[instrument(skip(state, payload))]
pub async fn compute_nutrition(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ComputeNutritionRequest>,
) -> Result<Json<NutritionSummary>, ApiError> {
    let (Some(_session_id), Some(ingredients), Some(meals)) = (
        payload.session_id.filter(|s| !s.trim().is_empty()),
        payload.ingredients.filter(|s| !s.trim().is_empty()),
        payload.meals,
    ) else {
        warn!("compute-nutrition missing required fields");
        return Err(ApiError::BadRequest(
            "Missing sessionId, ingredients or meals data".into(),
        ));
    };

    let pref = preference::load(state.kv.as_ref()).await;
    match summarize(&state.gateway, &pref, &ingredients, &meals).await {
        Ok(summary) => Ok(Json(summary)),
        Err(NutritionError::Unparseable { raw, source }) => {
            error!(error = %source, raw = %raw, "failed to parse nutrition data");
            Err(ApiError::Unparseable {
                error: "Failed to parse nutrition data from AI response".into(),
                raw,
                parse_error: source.to_string(),
            })
        }
        Err(NutritionError::Provider(e)) => {
            error!(error = %e, "compute nutrition failed");
            Err(ApiError::internal("Failed to compute nutrition", e))
        }
    }
}
