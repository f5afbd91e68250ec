//! Record types stored per user

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of generated plan; each kind is archived in its own collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Meal,
    Workout,
    Other,
}

impl PlanType {
    /// Name of the collection holding this plan type
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Meal => "meal_plans",
            Self::Workout => "workout_plans",
            Self::Other => "other_plans",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Workout => "workout",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognized lands in the `other` collection
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "meal" | "meal_plans" => Self::Meal,
            "workout" | "workout_plans" => Self::Workout,
            _ => Self::Other,
        })
    }
}

/// Placeholder metadata attached to every plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub calories: Option<f64>,
    pub exercises: Vec<String>,
    pub ingredients: Vec<String>,
}

/// A generated plan for one target day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique ID (UUIDv7)
    pub id: String,

    pub user_id: String,

    #[serde(rename = "type")]
    pub plan_type: PlanType,

    /// Structured plan body as produced by the generator
    pub content: serde_json::Value,

    /// Server-assigned creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Day the plan is meant for
    pub target_date: NaiveDate,

    pub metadata: PlanMetadata,
}

/// One exchange in a user's chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_input: String,
    pub bot_response: String,

    /// Server-assigned creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

/// Fitness goal flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FitnessGoals {
    pub endurance: bool,
    pub muscle_gain: bool,
    pub strength: bool,
    pub weight_loss: bool,
}

/// Biometric and preference profile of a user
///
/// Field names follow the camelCase documents the mobile app writes. Extra
/// fields (heart rate, step counts, ...) are kept in `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub name: Option<String>,
    pub age: Option<u32>,
    /// Height in centimetres
    pub height: Option<f64>,
    /// Weight in kilograms
    pub weight: Option<f64>,
    pub health_conditions: Option<String>,
    pub food_allergies: Option<String>,
    pub preference_food: Option<String>,
    pub fitness_goals: FitnessGoals,
    #[serde(alias = "workoutLevelString")]
    pub workout_level: Option<String>,
    #[serde(alias = "last_updated")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
