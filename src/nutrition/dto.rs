use serde::{Deserialize, Serialize};

use crate::meal_plans::MealPlan;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeNutritionRequest {
    pub session_id: Option<String>,
    pub ingredients: Option<String>,
    pub meals: Option<MealPlan>,
}

/// Week totals. Every field is always present; unknown values are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
    pub total_calories: f64,
    /// grams
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub total_sugar: f64,
    /// milligrams
    pub total_sodium: f64,
    pub total_calcium: f64,
    pub total_iron: f64,
    #[serde(rename = "totalVitaminC")]
    pub total_vitamin_c: f64,
    /// micrograms
    #[serde(rename = "totalVitaminA")]
    pub total_vitamin_a: f64,
    #[serde(rename = "totalVitaminD")]
    pub total_vitamin_d: f64,
}

impl NutritionSummary {
    pub const FIELDS: [&'static str; 12] = [
        "totalCalories",
        "totalProtein",
        "totalCarbs",
        "totalFat",
        "totalFiber",
        "totalSugar",
        "totalSodium",
        "totalCalcium",
        "totalIron",
        "totalVitaminC",
        "totalVitaminA",
        "totalVitaminD",
    ];

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        Some(match name {
            "totalCalories" => &mut self.total_calories,
            "totalProtein" => &mut self.total_protein,
            "totalCarbs" => &mut self.total_carbs,
            "totalFat" => &mut self.total_fat,
            "totalFiber" => &mut self.total_fiber,
            "totalSugar" => &mut self.total_sugar,
            "totalSodium" => &mut self.total_sodium,
            "totalCalcium" => &mut self.total_calcium,
            "totalIron" => &mut self.total_iron,
            "totalVitaminC" => &mut self.total_vitamin_c,
            "totalVitaminA" => &mut self.total_vitamin_a,
            "totalVitaminD" => &mut self.total_vitamin_d,
            _ => return None,
        })
    }
}
