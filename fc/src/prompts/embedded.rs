//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Assistant role and guidelines shared by every prompt
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// Free-text answer to a general question
pub const ANSWER: &str = include_str!("../../prompts/answer.pmt");

/// One day of a meal plan
pub const MEAL_PLAN: &str = include_str!("../../prompts/meal-plan.pmt");

/// One day of a workout plan
pub const WORKOUT_PLAN: &str = include_str!("../../prompts/workout-plan.pmt");

/// Daily macro targets for meal planning
pub const NUTRIENT_TARGETS: &str = include_str!("../../prompts/nutrient-targets.pmt");

/// Zero-shot intent scoring
pub const INTENT: &str = include_str!("../../prompts/intent.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "system" => Some(SYSTEM),
        "answer" => Some(ANSWER),
        "meal-plan" => Some(MEAL_PLAN),
        "workout-plan" => Some(WORKOUT_PLAN),
        "nutrient-targets" => Some(NUTRIENT_TARGETS),
        "intent" => Some(INTENT),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_known() {
        for name in ["system", "answer", "meal-plan", "workout-plan", "nutrient-targets", "intent"] {
            assert!(get_embedded(name).is_some(), "missing embedded prompt {}", name);
        }
        assert!(get_embedded("system").unwrap().contains("nutrition and fitness"));
        assert!(get_embedded("meal-plan").unwrap().contains("\"breakfast\""));
        assert!(get_embedded("workout-plan").unwrap().contains("\"exercise\""));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
