use axum::{extract::State, routing::post, Json, Router};
use tracing::{error, instrument};

use super::dto::{ComputeIngredientsRequest, ResolutionResult};
use super::services::{IngredientResolver, ResolveInput};
use crate::ai::preference;
use crate::{
    error::{ApiError, ApiJson},
    state::AppState,
};

pub fn ingredient_routes() -> Router<AppState> {
    Router::new().route("/compute-ingredients", post(compute_ingredients))
}

#[instrument(skip(state, resolver, payload))]
pub async fn compute_ingredients(
    State(state): State<AppState>,
    State(resolver): State<IngredientResolver>,
    ApiJson(payload): ApiJson<ComputeIngredientsRequest>,
) -> Result<Json<ResolutionResult>, ApiError> {
    let input = ResolveInput::try_from(payload)?;
    let pref = preference::load(state.kv.as_ref()).await;

    let result = resolver.resolve(&pref, &input).await.map_err(|e| {
        error!(error = %e, session_id = %input.session_id, "compute ingredients failed");
        ApiError::internal("Failed to compute ingredients", e)
    })?;
    Ok(Json(result))
}
