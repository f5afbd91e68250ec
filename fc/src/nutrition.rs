//! Nutrient targeting and the optional FoodData Central lookup

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::NutritionConfig;

/// Query words that make a general question worth a food database lookup
const LOOKUP_KEYWORDS: &[&str] = &[
    "calorie",
    "nutrition",
    "nutrient",
    "protein",
    "carb",
    "fat",
    "food",
    "ingredient",
    "vitamin",
];

/// Errors from nutrient targeting or food lookup
#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Lookup failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid nutrient targets: {0}")]
    InvalidTargets(String),

    #[error("Missing API key: {0} not set")]
    MissingKey(String),
}

/// Grams of one macronutrient per day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroRange {
    pub min: f64,
    pub target: f64,
    pub max: f64,
}

impl MacroRange {
    fn is_sane(&self) -> bool {
        self.min >= 0.0 && self.min <= self.target && self.target <= self.max
    }
}

/// Daily targets derived for a meal-plan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientTargets {
    pub calories: f64,
    pub protein_g: MacroRange,
    pub carbs_g: MacroRange,
    pub fats_g: MacroRange,
    #[serde(default)]
    pub rationale: String,
}

impl NutrientTargets {
    /// Parse extracted generator output, rejecting nonsensical ranges
    pub fn from_value(value: Value) -> Result<Self, NutritionError> {
        let targets: NutrientTargets =
            serde_json::from_value(value).map_err(|e| NutritionError::InvalidTargets(e.to_string()))?;
        if targets.calories <= 0.0 {
            return Err(NutritionError::InvalidTargets(format!(
                "calories must be positive, got {}",
                targets.calories
            )));
        }
        for (name, range) in [
            ("protein_g", &targets.protein_g),
            ("carbs_g", &targets.carbs_g),
            ("fats_g", &targets.fats_g),
        ] {
            if !range.is_sane() {
                return Err(NutritionError::InvalidTargets(format!(
                    "{} range out of order: {}/{}/{}",
                    name, range.min, range.target, range.max
                )));
            }
        }
        Ok(targets)
    }

    /// Lines for the "Nutritional Targets" prompt section
    pub fn describe(&self) -> String {
        let line = |label: &str, r: &MacroRange| {
            format!("- {}: {}g (range {}-{}g)", label, r.target, r.min, r.max)
        };
        let mut lines = vec![
            format!("- Calories: {}", self.calories),
            line("Protein", &self.protein_g),
            line("Carbohydrates", &self.carbs_g),
            line("Fats", &self.fats_g),
        ];
        if !self.rationale.trim().is_empty() {
            lines.push(format!("- Rationale: {}", self.rationale.trim()));
        }
        lines.join("\n")
    }

    /// Retrieval query steering the food menu toward these targets
    pub fn filter_query(&self, query: &str) -> String {
        format!(
            "foods providing {} calories {}g protein {}g carbohydrates {}g fats for {}",
            self.calories.round(),
            self.protein_g.target.round(),
            self.carbs_g.target.round(),
            self.fats_g.target.round(),
            query.trim()
        )
    }
}

/// Whether a query mentions food or nutrition terms
pub fn needs_lookup(query: &str) -> bool {
    let lower = query.to_lowercase();
    LOOKUP_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// A food returned by the lookup service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodRecord {
    pub description: String,
    pub brand: Option<String>,
    pub ingredients: Option<String>,
    /// Energy per serving in kcal
    pub calories: Option<f64>,
}

impl FoodRecord {
    pub fn summary(&self) -> String {
        let mut text = self.description.clone();
        if let Some(brand) = &self.brand {
            text.push_str(&format!(" ({})", brand));
        }
        match self.calories {
            Some(kcal) => text.push_str(&format!(": {} kcal", kcal)),
            None => text.push_str(": calories unknown"),
        }
        if let Some(ingredients) = &self.ingredients {
            text.push_str(&format!("; ingredients: {}", ingredients));
        }
        text
    }
}

/// Render lookup results for the answer prompt
pub fn format_foods(foods: &[FoodRecord]) -> String {
    foods
        .iter()
        .map(|f| format!("- {}", f.summary()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// External food database
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    async fn search(&self, text: &str) -> Result<Vec<FoodRecord>, NutritionError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    #[serde(default)]
    description: String,
    brand_owner: Option<String>,
    ingredients: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<SearchNutrient>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNutrient {
    nutrient_name: Option<String>,
    unit_name: Option<String>,
    value: Option<f64>,
}

impl From<SearchFood> for FoodRecord {
    fn from(food: SearchFood) -> Self {
        let calories = food
            .food_nutrients
            .iter()
            .find(|n| {
                n.nutrient_name.as_deref().is_some_and(|name| name.starts_with("Energy"))
                    && n.unit_name.as_deref().is_some_and(|u| u.eq_ignore_ascii_case("kcal"))
            })
            .and_then(|n| n.value);
        FoodRecord {
            description: food.description,
            brand: food.brand_owner.filter(|s| !s.is_empty()),
            ingredients: food.ingredients.filter(|s| !s.is_empty()),
            calories,
        }
    }
}

/// USDA FoodData Central search client
pub struct FoodDataCentralClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_results: usize,
}

impl FoodDataCentralClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, max_results: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
        }
    }

    /// Build from config, reading the API key from the configured env var
    pub fn from_config(config: &NutritionConfig) -> Result<Self, NutritionError> {
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| NutritionError::MissingKey(config.api_key_env.clone()))?;
        Ok(Self::new(&config.base_url, api_key, config.max_results))
    }

    fn search_url(&self) -> String {
        format!("{}/foods/search", self.base_url)
    }
}

#[async_trait]
impl NutritionLookup for FoodDataCentralClient {
    async fn search(&self, text: &str) -> Result<Vec<FoodRecord>, NutritionError> {
        debug!(max_results = self.max_results, "FoodDataCentralClient::search: called");
        let page_size = self.max_results.to_string();
        let response = self
            .http
            .get(self.search_url())
            .header("X-Api-Key", &self.api_key)
            .query(&[("query", text), ("pageSize", page_size.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "FoodDataCentralClient::search: request failed");
            return Err(NutritionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .foods
            .into_iter()
            .take(self.max_results)
            .map(FoodRecord::from)
            .collect())
    }
}
