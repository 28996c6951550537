use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::Date;

use crate::meal_plans::MealPlan;

pub const MEAL_DELIMITER: &str = "|";
pub const CACHE_NAMESPACE: &str = "meal-planner";

/// Every non-blank slot, trimmed and sorted, joined by `|`. Independent of which
/// day or slot a meal sits in.
pub fn normalized_meal_text(meals: &MealPlan) -> String {
    let mut items: Vec<&str> = meals
        .values()
        .flat_map(|day| [&day.breakfast, &day.lunch, &day.dinner])
        .filter_map(|slot| slot.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    items.sort_unstable();
    items.join(MEAL_DELIMITER)
}

/// `meal-planner:{session}:ingredients:{sha256(normalized)}`.
pub fn cache_key(session_id: &str, normalized: &str) -> String {
    let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
    format!("{CACHE_NAMESPACE}:{session_id}:ingredients:{digest}")
}

fn weekday_name(date: &str) -> Option<String> {
    let parsed = Date::parse(date, format_description!("[year]-[month]-[day]")).ok()?;
    Some(parsed.weekday().to_string())
}

/// Human-readable week listing used inside prompts.
pub fn format_meal_plan(meals: &MealPlan) -> String {
    let mut out = String::new();
    for (date, day) in meals {
        match weekday_name(date) {
            Some(name) => out.push_str(&format!("\n{name} ({date}):\n")),
            None => out.push_str(&format!("\n{date}:\n")),
        }
        for (label, meal) in day.slots() {
            if let Some(meal) = meal.map(str::trim).filter(|m| !m.is_empty()) {
                out.push_str(&format!("  {label}: {meal}\n"));
            }
        }
    }
    out
}

pub const GENERATION_SYSTEM_PROMPT: &str = "You are an expert chef with extensive recipe knowledge. Create precise, detailed shopping lists with exact quantities and specific ingredient types. Never use vague terms or generalizations.";

pub fn generation_prompt(meals: &MealPlan) -> String {
    let listing = format_meal_plan(meals);
    format!(
        r#"You are an expert cooking assistant with knowledge of specific recipes. For each meal listed below, use a well-known recipe you know and create an exact, detailed shopping list.

REQUIREMENTS:
1. For each meal, reference a specific recipe you know (e.g., "classic chicken curry", "traditional pasta carbonara")
2. List ALL ingredients with exact quantities (e.g., "2 lbs boneless chicken thighs", not "chicken")
3. Be specific about ingredient types (e.g., "yellow onions", "Roma tomatoes", "jasmine rice")
4. Include every ingredient needed - no vague terms like "other vegetables as necessary"
5. Use bullet points for each ingredient
6. Group by categories: Proteins, Vegetables, Dairy, Grains/Starches, Spices/Seasonings, Pantry Items
7. Include cooking essentials if needed in significant quantities (olive oil, salt, etc.)

Meal Plan:{listing}

Provide an exact shopping list with specific quantities for each ingredient. No generalizations or "as needed" items."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal_plans::DayMeals;

    fn day(b: &str, l: &str, d: &str) -> DayMeals {
        DayMeals {
            breakfast: Some(b.into()),
            lunch: Some(l.into()),
            dinner: Some(d.into()),
        }
    }

    #[test]
    fn normalization_ignores_dates_slots_and_whitespace() {
        let mut p1 = MealPlan::new();
        p1.insert("2024-01-01".into(), day("oatmeal", "", "grilled chicken"));
        p1.insert("2024-01-02".into(), day("", "tacos", ""));

        let mut p2 = MealPlan::new();
        p2.insert("2024-03-09".into(), day(" tacos ", "grilled chicken", ""));
        p2.insert("2024-03-10".into(), DayMeals {
            dinner: Some("oatmeal".into()),
            ..Default::default()
        });

        let n1 = normalized_meal_text(&p1);
        assert_eq!(n1, "grilled chicken|oatmeal|tacos");
        assert_eq!(n1, normalized_meal_text(&p2));
        assert_eq!(cache_key("s1", &n1), cache_key("s1", &normalized_meal_text(&p2)));
    }

    #[test]
    fn cache_key_depends_on_session_and_content() {
        let a = cache_key("s1", "oatmeal");
        assert!(a.starts_with("meal-planner:s1:ingredients:"));
        assert_eq!(a.len(), "meal-planner:s1:ingredients:".len() + 64);
        assert_ne!(a, cache_key("s2", "oatmeal"));
        assert_ne!(a, cache_key("s1", "oatmeal|toast"));
    }

    #[test]
    fn duplicate_meals_are_kept() {
        let mut p = MealPlan::new();
        p.insert("2024-01-01".into(), day("eggs", "eggs", ""));
        assert_eq!(normalized_meal_text(&p), "eggs|eggs");
    }

    #[test]
    fn meal_listing_names_weekdays_and_skips_blank_slots() {
        let mut p = MealPlan::new();
        p.insert("2024-01-01".into(), day("oatmeal", "", "grilled chicken"));
        let text = format_meal_plan(&p);
        assert_eq!(
            text,
            "\nMonday (2024-01-01):\n  Breakfast: oatmeal\n  Dinner: grilled chicken\n"
        );
    }

    #[test]
    fn unparseable_dates_are_listed_verbatim() {
        let mut p = MealPlan::new();
        p.insert("someday".into(), day("toast", "", ""));
        assert_eq!(format_meal_plan(&p), "\nsomeday:\n  Breakfast: toast\n");
    }

    #[test]
    fn generation_prompt_forbids_vague_terms() {
        let mut p = MealPlan::new();
        p.insert("2024-01-01".into(), day("oatmeal", "", ""));
        let prompt = generation_prompt(&p);
        assert!(prompt.contains("Monday (2024-01-01)"));
        assert!(prompt.contains("No generalizations or \"as needed\" items."));
        assert!(prompt.contains("Grains/Starches"));
    }
}
