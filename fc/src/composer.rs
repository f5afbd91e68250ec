//! Prompt assembly for every generation call the pipeline makes

use chrono::NaiveDate;
use eyre::Result;
use serde::Serialize;
use tracing::debug;

use crate::prompts::PromptLoader;

/// Per-request material shared by answer and plan prompts
#[derive(Debug, Clone, Default, Serialize)]
pub struct Grounding {
    /// Formatted biometric block
    pub profile: String,
    /// Rendered retrieval context
    pub context: String,
    /// Formatted conversation transcript
    pub history: String,
    pub query: String,
}

/// Which day of a batch a plan prompt is for
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DaySlot {
    pub target_date: NaiveDate,
    /// 1-based position in the batch
    pub day: usize,
    pub days: usize,
}

#[derive(Serialize)]
struct AnswerVars<'a> {
    system: &'a str,
    #[serde(flatten)]
    grounding: &'a Grounding,
    food_data: Option<&'a str>,
}

#[derive(Serialize)]
struct PlanVars<'a> {
    system: &'a str,
    #[serde(flatten)]
    grounding: &'a Grounding,
    #[serde(flatten)]
    slot: DaySlot,
    targets: Option<&'a str>,
}

#[derive(Serialize)]
struct TargetVars<'a> {
    system: &'a str,
    profile: &'a str,
    query: &'a str,
}

#[derive(Serialize)]
struct IntentVars<'a> {
    query: &'a str,
}

/// Builds prompts from templates, prefixing the assistant role text where the template asks for it
pub struct PromptComposer {
    loader: PromptLoader,
    system: String,
}

impl PromptComposer {
    /// Load the role text once; template errors surface here rather than mid-request
    pub fn new(loader: PromptLoader) -> Result<Self> {
        debug!("PromptComposer::new: called");
        let system = loader.load_template("system")?.trim_end().to_string();
        Ok(Self { loader, system })
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Free-text answer prompt; `food_data` is included only when present
    pub fn answer(&self, grounding: &Grounding, food_data: Option<&str>) -> Result<String> {
        debug!(has_food_data = food_data.is_some(), "answer: called");
        self.loader.render(
            "answer",
            &AnswerVars {
                system: &self.system,
                grounding,
                food_data: food_data.filter(|s| !s.trim().is_empty()),
            },
        )
    }

    /// Single-day meal plan prompt
    pub fn meal_plan(&self, grounding: &Grounding, slot: DaySlot, targets: Option<&str>) -> Result<String> {
        debug!(%slot.target_date, slot.day, slot.days, "meal_plan: called");
        self.loader.render(
            "meal-plan",
            &PlanVars {
                system: &self.system,
                grounding,
                slot,
                targets,
            },
        )
    }

    /// Single-day workout plan prompt
    pub fn workout_plan(&self, grounding: &Grounding, slot: DaySlot) -> Result<String> {
        debug!(%slot.target_date, slot.day, slot.days, "workout_plan: called");
        self.loader.render(
            "workout-plan",
            &PlanVars {
                system: &self.system,
                grounding,
                slot,
                targets: None,
            },
        )
    }

    /// Prompt asking for daily macro targets
    pub fn nutrient_targets(&self, profile: &str, query: &str) -> Result<String> {
        debug!("nutrient_targets: called");
        self.loader.render(
            "nutrient-targets",
            &TargetVars {
                system: &self.system,
                profile,
                query,
            },
        )
    }

    /// Zero-shot intent scoring prompt
    pub fn intent(&self, query: &str) -> Result<String> {
        debug!("intent: called");
        self.loader.render("intent", &IntentVars { query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> PromptComposer {
        PromptComposer::new(PromptLoader::embedded_only()).unwrap()
    }

    fn grounding() -> Grounding {
        Grounding {
            profile: "Age: 30".to_string(),
            context: "Food: Oats".to_string(),
            history: "User: hi\nBot: hello".to_string(),
            query: "what's good for breakfast?".to_string(),
        }
    }

    fn slot() -> DaySlot {
        DaySlot {
            target_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            day: 2,
            days: 7,
        }
    }

    #[test]
    fn test_answer_prompt() {
        let c = composer();
        let prompt = c.answer(&grounding(), None).unwrap();

        assert!(prompt.contains(c.system()));
        assert!(prompt.contains("User Information:\nAge: 30"));
        assert!(prompt.contains("Relevant Context:\nFood: Oats"));
        assert!(prompt.contains("Conversation History:\nUser: hi\nBot: hello"));
        assert!(prompt.contains("User Query: what's good for breakfast?"));
        assert!(!prompt.contains("Food Data Central"));
    }

    #[test]
    fn test_answer_prompt_with_food_data() {
        let prompt = composer().answer(&grounding(), Some("Oats: 379 kcal")).unwrap();
        assert!(prompt.contains("Food Data Central Results:\nOats: 379 kcal"));

        let prompt = composer().answer(&grounding(), Some("  ")).unwrap();
        assert!(!prompt.contains("Food Data Central"));
    }

    #[test]
    fn test_meal_plan_prompt() {
        let c = composer();
        let prompt = c.meal_plan(&grounding(), slot(), None).unwrap();
        assert!(prompt.contains("generate a meal plan for 2024-03-02 (day 2 of 7)"));
        assert!(prompt.contains("Food menu:\nFood: Oats"));
        assert!(!prompt.contains("Nutritional Targets:"));

        let prompt = c.meal_plan(&grounding(), slot(), Some("Calories: 1800")).unwrap();
        assert!(prompt.contains("Nutritional Targets:\nCalories: 1800"));
        assert!(prompt.contains("Select foods from the following options:"));
    }

    #[test]
    fn test_workout_plan_prompt() {
        let prompt = composer().workout_plan(&grounding(), slot()).unwrap();
        assert!(prompt.contains("generate a workout plan for 2024-03-02 (day 2 of 7)"));
        assert!(prompt.contains("\"exercise\""));
        assert!(prompt.contains("User Query: what's good for breakfast?"));
    }

    #[test]
    fn test_nutrient_targets_and_intent_prompts() {
        let c = composer();
        let prompt = c.nutrient_targets("Age: 30", "meal plan to cut").unwrap();
        assert!(prompt.contains("User Information:\nAge: 30"));
        assert!(prompt.contains("\"protein_g\""));

        let prompt = c.intent("build me a diet plan").unwrap();
        assert!(prompt.contains("User Query: build me a diet plan"));
        assert!(prompt.contains("workout_plan"));
    }
}
