//! Intent classification: which branch handles a query

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::composer::PromptComposer;
use crate::extract::extract;
use crate::llm::ResilientClient;

const MEAL_PHRASES: &[&str] = &["meal plan", "meals plan", "diet plan", "nutrition plan"];
const WORKOUT_PHRASES: &[&str] = &["workout plan", "exercise plan"];

/// Handling branch for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    MealPlan,
    WorkoutPlan,
    General,
}

impl Intent {
    /// Labels in tie-break priority order
    pub const ALL: [Intent; 3] = [Intent::MealPlan, Intent::WorkoutPlan, Intent::General];

    pub fn label(&self) -> &'static str {
        match self {
            Self::MealPlan => "meal_plan",
            Self::WorkoutPlan => "workout_plan",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How queries are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    /// Fixed phrase matching
    Keyword,
    /// Zero-shot scoring by the generation backend
    Semantic,
}

/// Classify by case-insensitive phrase matching; meal plans win ties
pub fn classify_keywords(query: &str) -> Intent {
    let lower = query.to_lowercase();
    if MEAL_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::MealPlan
    } else if WORKOUT_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::WorkoutPlan
    } else {
        Intent::General
    }
}

/// Pick the highest-scoring label from `{"meal_plan": s, "workout_plan": s, "general": s}`
///
/// Returns None unless at least one label carries a numeric score.
pub fn best_label(scores: &Value) -> Option<Intent> {
    let obj = scores.as_object()?;
    let mut best: Option<(Intent, f64)> = None;
    for intent in Intent::ALL {
        let Some(score) = obj.get(intent.label()).and_then(Value::as_f64) else {
            continue;
        };
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((intent, score));
        }
    }
    best.map(|(intent, _)| intent)
}

/// Routes queries to a handling branch
///
/// Never fails: semantic classification falls back to keywords.
#[derive(Clone)]
pub struct IntentClassifier {
    strategy: ClassifierStrategy,
    llm: ResilientClient,
    prompts: Arc<PromptComposer>,
}

impl IntentClassifier {
    pub fn new(strategy: ClassifierStrategy, llm: ResilientClient, prompts: Arc<PromptComposer>) -> Self {
        Self { strategy, llm, prompts }
    }

    pub async fn classify(&self, query: &str) -> Intent {
        debug!(strategy = ?self.strategy, "classify: called");
        let keyword = classify_keywords(query);
        if self.strategy == ClassifierStrategy::Keyword {
            return keyword;
        }

        let prompt = match self.prompts.intent(query) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "classify: intent prompt failed, using keywords");
                return keyword;
            }
        };

        let semantic = match self.llm.generate_structured(&prompt).await {
            Ok(text) => extract(&text).ok().as_ref().and_then(best_label),
            Err(e) => {
                warn!(error = %e, "classify: backend failed, using keywords");
                None
            }
        };

        match semantic {
            Some(intent) => {
                debug!(%intent, %keyword, "classify: semantic result");
                intent
            }
            None => {
                warn!("classify: unusable scores, using keywords");
                keyword
            }
        }
    }
}
