use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use super::dto::NutritionSummary;
use crate::ai::{GenerationOutput, ProviderError, ProviderGateway, ProviderPreference};
use crate::meal_plans::MealPlan;

pub const NUTRITION_SYSTEM_PROMPT: &str = "You are a nutrition expert that analyzes meal plans and provides detailed nutritional information in JSON format.";
const NUTRITION_MAX_TOKENS: u32 = 2000;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)\A```[^\n]*\n(.*)```").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum NutritionParseError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum NutritionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("unparseable nutrition output: {source}")]
    Unparseable {
        raw: String,
        #[source]
        source: NutritionParseError,
    },
}

pub fn nutrition_prompt(ingredients: &str, meals: &MealPlan) -> String {
    let meals_json = serde_json::to_string_pretty(meals).unwrap_or_default();
    format!(
        r#"Based on the following ingredients and meal plan, calculate the total nutritional information for all the meals provided.

Please provide total macros and key nutrition information for all the meals listed:
1. Total calories for all meals
2. Total protein in grams
3. Total carbs in grams
4. Total fat in grams
5. Total fiber in grams
6. Total sugar in grams
7. Total sodium in milligrams
8. Total calcium in milligrams
9. Total iron in milligrams
10. Total vitamin C in milligrams
11. Total vitamin A in micrograms
12. Total vitamin D in micrograms

Format your response as a JSON object with this structure:
{{
  "totalCalories": number,
  "totalProtein": number,
  "totalCarbs": number,
  "totalFat": number,
  "totalFiber": number,
  "totalSugar": number,
  "totalSodium": number,
  "totalCalcium": number,
  "totalIron": number,
  "totalVitaminC": number,
  "totalVitaminA": number,
  "totalVitaminD": number
}}

Ingredients: {ingredients}

Meal Plan: {meals_json}

IMPORTANT: Return ONLY the JSON object with no markdown formatting, no code blocks, no explanations, and no additional text. Start directly with {{ and end with }}."#
    )
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => trimmed,
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number(field: &str, v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
            warn!(field, value = %s, "non-numeric nutrition value, using 0");
            0.0
        }),
        None | Some(Value::Null) => {
            warn!(field, "missing nutrition field, using 0");
            0.0
        }
        Some(other) => {
            warn!(field, kind = kind(other), "unexpected nutrition value, using 0");
            0.0
        }
    }
}

fn summary_from(obj: &Map<String, Value>) -> NutritionSummary {
    let mut summary = NutritionSummary::default();
    for name in NutritionSummary::FIELDS {
        if let Some(slot) = summary.field_mut(name) {
            *slot = number(name, obj.get(name));
        }
    }
    summary
}

/// Normalises either backend's output into a summary. Plain text may be wrapped
/// in a code fence; an object `response` member is unwrapped once.
pub fn parse_summary(output: GenerationOutput) -> Result<NutritionSummary, NutritionParseError> {
    let value = match output {
        GenerationOutput::Text(text) => serde_json::from_str::<Value>(strip_code_fence(&text))?,
        GenerationOutput::Nested(value) => value,
    };
    let value = match value {
        Value::Object(mut obj) if matches!(obj.get("response"), Some(Value::Object(_))) => {
            obj.remove("response").unwrap_or(Value::Object(obj))
        }
        other => other,
    };
    match &value {
        Value::Object(obj) => Ok(summary_from(obj)),
        other => Err(NutritionParseError::NotAnObject(kind(other))),
    }
}

#[instrument(skip(gateway, pref, ingredients, meals), fields(provider = %pref.provider))]
pub async fn compute_nutrition(
    gateway: &ProviderGateway,
    pref: &ProviderPreference,
    ingredients: &str,
    meals: &MealPlan,
) -> Result<NutritionSummary, NutritionError> {
    let prompt = nutrition_prompt(ingredients, meals);
    let output = gateway
        .generate(pref, &prompt, NUTRITION_SYSTEM_PROMPT, NUTRITION_MAX_TOKENS)
        .await?;
    let raw = output.raw();
    parse_summary(output).map_err(|source| NutritionError::Unparseable { raw, source })
}
