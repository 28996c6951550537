use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Meals for one day. Missing and blank slots are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMeals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakfast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dinner: Option<String>,
}

impl DayMeals {
    /// Slots in display order, labelled.
    pub fn slots(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("Breakfast", self.breakfast.as_deref()),
            ("Lunch", self.lunch.as_deref()),
            ("Dinner", self.dinner.as_deref()),
        ]
    }
}

/// ISO date → that day's meals. Ordered by date for display.
pub type MealPlan = BTreeMap<String, DayMeals>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMealPlanRequest {
    pub session_id: Option<String>,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
    pub meals: Option<MealPlan>,
    pub ingredients: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMealPlanResponse {
    pub success: bool,
    pub message: String,
    pub week_start: String,
    pub week_end: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMealPlanQuery {
    pub session_id: Option<String>,
    pub week_start: Option<String>,
    pub week_end: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDetails {
    pub week_start: String,
    pub week_end: String,
    pub meals: MealPlan,
    pub ingredients: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMealPlanResponse {
    pub success: bool,
    pub meal_plan: MealPlanDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_plan_accepts_partial_and_blank_slots() {
        let plan: MealPlan = serde_json::from_str(
            r#"{"2024-01-02":{"dinner":"tacos"},"2024-01-01":{"breakfast":"oatmeal","lunch":"","dinner":"grilled chicken"}}"#,
        )
        .unwrap();
        assert_eq!(plan.keys().collect::<Vec<_>>(), vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(plan["2024-01-01"].lunch.as_deref(), Some(""));
        assert_eq!(plan["2024-01-02"].breakfast, None);
    }
}
