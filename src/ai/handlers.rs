use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::dto::{GetProviderResponse, ProviderKind, SetProviderRequest, SetProviderResponse};
use super::preference;
use crate::{
    error::{ApiError, ApiJson},
    state::AppState,
};

pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/set-ai-provider", post(set_ai_provider))
        .route("/get-ai-provider", get(get_ai_provider))
}

#[instrument(skip(state, payload))]
pub async fn set_ai_provider(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SetProviderRequest>,
) -> Result<Json<SetProviderResponse>, ApiError> {
    let Some(provider) = payload.provider.as_deref().and_then(ProviderKind::parse) else {
        warn!(provider = ?payload.provider, "invalid ai provider");
        return Err(ApiError::BadRequest(
            r#"Invalid AI provider. Must be "workers-ai" or "claude""#.into(),
        ));
    };

    let api_key = match provider {
        ProviderKind::Claude => match payload.api_key.as_deref() {
            Some(key) if preference::is_valid_claude_key(key) => Some(key),
            _ => {
                warn!("claude selected without a valid api key");
                return Err(ApiError::BadRequest("Valid Claude API key is required".into()));
            }
        },
        ProviderKind::WorkersAi => None,
    };

    if let Err(e) = preference::store(state.kv.as_ref(), provider, api_key).await {
        error!(error = %e, "storing ai provider failed");
        return Err(ApiError::internal("Failed to set AI provider", format!("{e:#}")));
    }

    info!(%provider, "ai provider set");
    Ok(Json(SetProviderResponse {
        success: true,
        provider,
        message: format!("AI provider set to {provider}"),
    }))
}

#[instrument(skip(state))]
pub async fn get_ai_provider(State(state): State<AppState>) -> Json<GetProviderResponse> {
    let pref = preference::load(state.kv.as_ref()).await;
    Json(GetProviderResponse {
        success: true,
        provider: pref.provider,
        explicitly_set: pref.explicitly_set,
    })
}
