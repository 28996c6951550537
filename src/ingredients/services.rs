use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use tracing::{debug, info, instrument, warn};

use super::dto::{ComputeIngredientsRequest, ResolutionResult};
use super::normalize::{cache_key, generation_prompt, normalized_meal_text, GENERATION_SYSTEM_PROMPT};
use crate::ai::{ProviderError, ProviderGateway, ProviderPreference};
use crate::config::ResolverConfig;
use crate::embeddings::EmbeddingIndex;
use crate::error::ApiError;
use crate::kv::KvStore;
use crate::meal_plans::{MealPlan, MealPlanRepo};
use crate::state::AppState;

const GENERATION_MAX_TOKENS: u32 = 1000;

/// Validated compute-ingredients input.
#[derive(Debug, Clone)]
pub struct ResolveInput {
    pub session_id: String,
    pub meals: MealPlan,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
}

impl TryFrom<ComputeIngredientsRequest> for ResolveInput {
    type Error = ApiError;

    fn try_from(req: ComputeIngredientsRequest) -> Result<Self, Self::Error> {
        let session_id = req
            .session_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("sessionId is required".into()))?;
        let meals = req
            .meals
            .ok_or_else(|| ApiError::BadRequest("meals is required".into()))?;
        Ok(Self {
            session_id,
            meals,
            week_start: req.week_start.filter(|s| !s.is_empty()),
            week_end: req.week_end.filter(|s| !s.is_empty()),
        })
    }
}

/// Exact cache, then semantic adaptation, then full generation.
#[derive(Clone)]
pub struct IngredientResolver {
    kv: Arc<dyn KvStore>,
    index: Arc<EmbeddingIndex>,
    gateway: Arc<ProviderGateway>,
    plans: Arc<dyn MealPlanRepo>,
    settings: ResolverConfig,
}

impl FromRef<AppState> for IngredientResolver {
    fn from_ref(state: &AppState) -> Self {
        Self {
            kv: state.kv.clone(),
            index: state.index.clone(),
            gateway: state.gateway.clone(),
            plans: state.plans.clone(),
            settings: state.config.resolver.clone(),
        }
    }
}

/// Logs and discards the failure of a step whose outcome must not affect the response.
fn best_effort<T>(step: &'static str, res: anyhow::Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(step, error = %format!("{e:#}"), "best-effort step failed");
            None
        }
    }
}

impl IngredientResolver {
    fn ttl(&self) -> Duration {
        Duration::from_secs(self.settings.cache_ttl_secs)
    }

    #[instrument(skip(self, pref, input), fields(session_id = %input.session_id))]
    pub async fn resolve(
        &self,
        pref: &ProviderPreference,
        input: &ResolveInput,
    ) -> Result<ResolutionResult, ProviderError> {
        let normalized = normalized_meal_text(&input.meals);
        let key = cache_key(&input.session_id, &normalized);

        match self.kv.get(&key).await {
            Ok(Some(hit)) => {
                info!(%key, "exact cache hit");
                return Ok(ResolutionResult::from_cache(hit));
            }
            Ok(None) => debug!(%key, "exact cache miss"),
            Err(e) => warn!(error = %e, %key, "cache lookup failed"),
        }

        // one embedding per request, shared by the lookup and the write-back
        let embedding = match self.index.embed(&normalized).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "embedding failed, falling back to generation");
                None
            }
        };

        if let Some(vector) = &embedding {
            if let Some(result) = self.try_semantic(pref, input, &normalized, &key, vector).await {
                return Ok(result);
            }
        }

        self.generate(pref, input, &normalized, &key, embedding).await
    }

    async fn try_semantic(
        &self,
        pref: &ProviderPreference,
        input: &ResolveInput,
        normalized: &str,
        key: &str,
        vector: &[f32],
    ) -> Option<ResolutionResult> {
        let similar = match self
            .index
            .nearest(vector, self.settings.similarity_threshold)
            .await
        {
            Ok(Some(similar)) => similar,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "semantic search failed, falling back to generation");
                return None;
            }
        };

        let adapted = match self
            .gateway
            .adapt(pref, &similar.meal_text, normalized, &similar.ingredients)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("adaptation returned nothing, falling back to generation");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "adaptation failed, falling back to generation");
                return None;
            }
        };

        best_effort("cache write", self.kv.put(key, &adapted, Some(self.ttl())).await);
        best_effort(
            "vector upsert",
            self.index
                .remember(&input.session_id, normalized, &adapted, Some(vector.to_vec()))
                .await,
        );

        info!(similarity = similar.similarity, adapted_from = %similar.meal_text, "semantic adaptation");
        Some(ResolutionResult::adapted(adapted, similar.similarity, similar.meal_text))
    }

    async fn generate(
        &self,
        pref: &ProviderPreference,
        input: &ResolveInput,
        normalized: &str,
        key: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<ResolutionResult, ProviderError> {
        let prompt = generation_prompt(&input.meals);
        let ingredients = self
            .gateway
            .generate(pref, &prompt, GENERATION_SYSTEM_PROMPT, GENERATION_MAX_TOKENS)
            .await?
            .into_text();

        if ingredients.trim().is_empty() {
            warn!("generation returned an empty list; not caching");
        } else {
            best_effort("cache write", self.kv.put(key, &ingredients, Some(self.ttl())).await);
            if let Some(vector) = embedding {
                best_effort(
                    "vector upsert",
                    self.index
                        .remember(&input.session_id, normalized, &ingredients, Some(vector))
                        .await,
                );
            }
        }

        match (&input.week_start, &input.week_end) {
            (Some(start), Some(end)) => {
                best_effort(
                    "meal plan upsert",
                    self.plans
                        .upsert(&input.session_id, start, end, &input.meals, &ingredients)
                        .await,
                );
            }
            _ => debug!("no week range supplied; meal plan not persisted"),
        }

        info!(chars = ingredients.len(), "generated fresh ingredients");
        Ok(ResolutionResult::generated(ingredients))
    }
}
