use serde::{Deserialize, Serialize};

use crate::meal_plans::MealPlan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeIngredientsRequest {
    pub session_id: Option<String>,
    pub meals: Option<MealPlan>,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
}

/// Which tier produced the ingredient list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    ExactCache,
    SemanticAdaptation,
    AiGeneration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub ingredients: String,
    pub cached: bool,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapted_from: Option<String>,
    pub message: String,
}

impl ResolutionResult {
    pub fn from_cache(ingredients: String) -> Self {
        Self {
            ingredients,
            cached: true,
            source: Source::ExactCache,
            similarity: None,
            adapted_from: None,
            message: "Served from cache - identical meals detected".into(),
        }
    }

    pub fn adapted(ingredients: String, similarity: f32, adapted_from: String) -> Self {
        Self {
            ingredients,
            cached: false,
            source: Source::SemanticAdaptation,
            similarity: Some(similarity),
            adapted_from: Some(adapted_from),
            message: format!("Adapted from similar meal ({:.1}% match)", similarity * 100.0),
        }
    }

    pub fn generated(ingredients: String) -> Self {
        Self {
            ingredients,
            cached: false,
            source: Source::AiGeneration,
            similarity: None,
            adapted_from: None,
            message: "Generated fresh ingredients list".into(),
        }
    }
}
