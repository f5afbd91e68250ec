//! Request orchestration
//!
//! Every request runs classify, ground, generate and record. Plan requests
//! additionally extract structured output per day and persist the batch only
//! when every day succeeded. A response is always produced; internal failures
//! surface as fixed user-safe messages while the detail goes to the log.

use std::path::Path;
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use eyre::Context;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use userstore::PlanType;

use crate::composer::{DaySlot, Grounding, PromptComposer};
use crate::config::Config;
use crate::extract::{ExtractionError, extract};
use crate::intent::{ClassifierStrategy, Intent, IntentClassifier};
use crate::llm::{LlmError, ResilientClient, create_client};
use crate::memory::ConversationMemory;
use crate::nutrition::{FoodDataCentralClient, NutrientTargets, NutritionLookup, format_foods, needs_lookup};
use crate::plans::PlanStore;
use crate::profile::format_profile;
use crate::prompts::PromptLoader;
use crate::request::{QueryRequest, QueryResponse};
use crate::retrieval::{ContextRetriever, DocumentIndex, LocalIndex};
use crate::state::StateManager;

/// Returned whenever a general answer cannot be produced or a plan cannot be stored
pub const APOLOGY: &str = "I apologize, but I encountered an error processing your request. Please try again.";

/// Tunables of the pipeline
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub classifier: ClassifierStrategy,
    /// Derive macro targets before meal planning
    pub use_nutrient_targeting: bool,
    pub top_k: usize,
    /// Documents included in each prompt
    pub context_docs: usize,
    pub memory_capacity: usize,
    pub plan_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            classifier: ClassifierStrategy::Keyword,
            use_nutrient_targeting: true,
            top_k: docstore::DEFAULT_TOP_K,
            context_docs: 3,
            memory_capacity: userstore::DEFAULT_HISTORY_CAPACITY,
            plan_capacity: userstore::DEFAULT_PLAN_CAPACITY,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            classifier: config.pipeline.classifier,
            use_nutrient_targeting: config.pipeline.use_nutrient_targeting,
            top_k: config.retrieval.top_k,
            context_docs: config.retrieval.context_docs,
            memory_capacity: config.memory.capacity,
            plan_capacity: config.plans.capacity,
        }
    }
}

/// Why a plan batch was abandoned
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    #[error("Nutrient targeting failed: {0}")]
    Targets(String),

    #[error("Generation failed on day {day}: {source}")]
    Generation {
        day: usize,
        #[source]
        source: LlmError,
    },

    #[error("Extraction failed on day {day}: {source}")]
    Extraction {
        day: usize,
        #[source]
        source: ExtractionError,
    },

    #[error("Day {day} output is not a {plan_type} plan")]
    Shape { day: usize, plan_type: PlanType },

    #[error("Date out of range after {0}")]
    DateOverflow(NaiveDate),
}

/// Whether extracted output has the shape of a plan of this type
pub fn has_plan_shape(plan_type: PlanType, content: &Value) -> bool {
    match plan_type {
        PlanType::Meal => content.as_object().is_some_and(|o| o.contains_key("breakfast")),
        PlanType::Workout => content.as_array().is_some_and(|a| !a.is_empty()),
        PlanType::Other => content.is_object() || content.is_array(),
    }
}

fn success_message(plan_type: PlanType, weekly: bool) -> String {
    let scope = if weekly { "weekly " } else { "" };
    match plan_type {
        PlanType::Meal => format!(
            "Your {}meal plan has been updated! 🥗 Check the 'Meals Plan' page to view it.",
            scope
        ),
        PlanType::Workout => format!(
            "Your {}workout plan has been updated! 💪 Check the 'Workout Plan' page to view it.",
            scope
        ),
        PlanType::Other => format!("Your {}plan has been updated!", scope),
    }
}

fn failure_message(plan_type: PlanType) -> String {
    format!("Error generating {} plan. Please try again.", plan_type)
}

/// Coordinates classification, retrieval, generation and persistence
pub struct Orchestrator {
    classifier: IntentClassifier,
    retriever: ContextRetriever,
    llm: ResilientClient,
    prompts: Arc<PromptComposer>,
    state: StateManager,
    memory: ConversationMemory,
    plans: PlanStore,
    nutrition: Option<Arc<dyn NutritionLookup>>,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(
        llm: ResilientClient,
        index: Arc<dyn DocumentIndex>,
        state: StateManager,
        prompts: PromptComposer,
        options: PipelineOptions,
    ) -> Self {
        debug!(?options, "Orchestrator::new: called");
        let prompts = Arc::new(prompts);
        Self {
            classifier: IntentClassifier::new(options.classifier, llm.clone(), Arc::clone(&prompts)),
            retriever: ContextRetriever::new(index, options.top_k, options.context_docs),
            memory: ConversationMemory::new(state.clone(), options.memory_capacity),
            plans: PlanStore::new(state.clone(), options.plan_capacity),
            llm,
            prompts,
            state,
            nutrition: None,
            options,
        }
    }

    /// Consult a food database for nutrition questions
    pub fn with_nutrition(mut self, lookup: Arc<dyn NutritionLookup>) -> Self {
        self.nutrition = Some(lookup);
        self
    }

    /// Wire up every collaborator from configuration
    ///
    /// Prompt overrides are looked up under `root`. Must be called inside a
    /// tokio runtime since the state actor is spawned here.
    pub fn from_config(config: &Config, root: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(root = %root.as_ref().display(), "Orchestrator::from_config: called");
        let client = create_client(&config.llm).context("Failed to create generation client")?;
        let llm = ResilientClient::new(client, config.retry.policy()).with_sampling(
            config.llm.temperature,
            config.llm.structured_temperature,
            config.llm.max_tokens,
        );

        let index = LocalIndex::open(&config.retrieval.index_dir).context("Failed to open reference index")?;
        let state = StateManager::spawn(&config.storage.db_path)
            .context(format!("Failed to open user store {}", config.storage.db_path.display()))?;
        let prompts = PromptComposer::new(PromptLoader::new(root))?;

        let orchestrator = Self::new(llm, Arc::new(index), state, prompts, PipelineOptions::from_config(config));

        if !config.nutrition.enabled {
            return Ok(orchestrator);
        }
        match FoodDataCentralClient::from_config(&config.nutrition) {
            Ok(client) => Ok(orchestrator.with_nutrition(Arc::new(client))),
            Err(e) => {
                warn!(error = %e, "Nutrition lookup enabled but unavailable");
                Ok(orchestrator)
            }
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn plans(&self) -> &PlanStore {
        &self.plans
    }

    /// Answer a request; never fails
    pub async fn handle(&self, request: &QueryRequest) -> QueryResponse {
        debug!(user_id = %request.user_id, is_weekly = request.is_weekly, "handle: called");
        let intent = self.classifier.classify(&request.query).await;
        info!(user_id = %request.user_id, %intent, "Handling request");

        let response = match intent {
            Intent::General => self.answer(request).await,
            Intent::MealPlan => self.plan(request, PlanType::Meal).await,
            Intent::WorkoutPlan => self.plan(request, PlanType::Workout).await,
        };

        if let Err(e) = self.memory.append(&request.user_id, &request.query, &response).await {
            error!(user_id = %request.user_id, error = %e, "Failed to record conversation turn");
        }
        QueryResponse::new(response)
    }

    async fn profile_text(&self, user_id: &str) -> String {
        match self.state.get_profile(user_id).await {
            Ok(profile) => format_profile(profile.as_ref()),
            Err(e) => {
                warn!(%user_id, error = %e, "Profile unavailable, continuing without it");
                format_profile(None)
            }
        }
    }

    async fn history_text(&self, user_id: &str) -> String {
        match self.memory.get(user_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(%user_id, error = %e, "History unavailable, continuing without it");
                String::new()
            }
        }
    }

    async fn food_data(&self, query: &str) -> Option<String> {
        let lookup = self.nutrition.as_ref()?;
        if !needs_lookup(query) {
            return None;
        }
        match lookup.search(query).await {
            Ok(foods) if !foods.is_empty() => Some(format_foods(&foods)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Food lookup failed");
                None
            }
        }
    }

    async fn answer(&self, request: &QueryRequest) -> String {
        debug!("answer: called");
        let (profile, context, history, food_data) = tokio::join!(
            self.profile_text(&request.user_id),
            self.retriever.context_for(&request.query),
            self.history_text(&request.user_id),
            self.food_data(&request.query),
        );
        let grounding = Grounding {
            profile,
            context,
            history,
            query: request.query.clone(),
        };

        let prompt = match self.prompts.answer(&grounding, food_data.as_deref()) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(error = %e, "Failed to render answer prompt");
                return APOLOGY.to_string();
            }
        };

        match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Answer generation failed");
                APOLOGY.to_string()
            }
        }
    }

    async fn plan(&self, request: &QueryRequest, plan_type: PlanType) -> String {
        let start = request.start_date.unwrap_or_else(|| Local::now().date_naive());
        debug!(%plan_type, %start, days = request.days(), "plan: called");

        let collected = match self.generate_batch(request, plan_type, start).await {
            Ok(collected) => collected,
            Err(e) => {
                error!(user_id = %request.user_id, %plan_type, error = %e, "Plan batch abandoned");
                return failure_message(plan_type);
            }
        };

        for (target_date, content) in collected {
            if let Err(e) = self.plans.save(&request.user_id, plan_type, content, target_date).await {
                error!(user_id = %request.user_id, %plan_type, %target_date, error = %e, "Failed to save plan");
                return APOLOGY.to_string();
            }
        }

        info!(user_id = %request.user_id, %plan_type, days = request.days(), "Plan batch saved");
        success_message(plan_type, request.is_weekly)
    }

    async fn derive_targets(&self, profile: &str, query: &str) -> Result<NutrientTargets, BatchError> {
        debug!("derive_targets: called");
        let prompt = self
            .prompts
            .nutrient_targets(profile, query)
            .map_err(|e| BatchError::Prompt(e.to_string()))?;
        let text = self
            .llm
            .generate_structured(&prompt)
            .await
            .map_err(|e| BatchError::Targets(e.to_string()))?;
        let value = extract(&text).map_err(|e| BatchError::Targets(e.to_string()))?;
        let targets = NutrientTargets::from_value(value).map_err(|e| BatchError::Targets(e.to_string()))?;
        debug!(calories = targets.calories, "derive_targets: derived");
        Ok(targets)
    }

    /// Generate every day of the batch; the first failing day abandons the rest
    async fn generate_batch(
        &self,
        request: &QueryRequest,
        plan_type: PlanType,
        start: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Value)>, BatchError> {
        let targeting = plan_type == PlanType::Meal && self.options.use_nutrient_targeting;
        let raw_context = async {
            if targeting {
                None
            } else {
                Some(self.retriever.context_for(&request.query).await)
            }
        };
        let (profile, history, raw_context) = tokio::join!(
            self.profile_text(&request.user_id),
            self.history_text(&request.user_id),
            raw_context,
        );

        let (context, targets) = match raw_context {
            Some(context) => (context, None),
            None => {
                let targets = self.derive_targets(&profile, &request.query).await?;
                let context = self
                    .retriever
                    .context_for(&targets.filter_query(&request.query))
                    .await;
                (context, Some(targets.describe()))
            }
        };

        let grounding = Grounding {
            profile,
            context,
            history,
            query: request.query.clone(),
        };

        let days = request.days();
        let mut collected = Vec::with_capacity(days);
        for offset in 0..days {
            let day = offset + 1;
            let target_date = start
                .checked_add_days(Days::new(offset as u64))
                .ok_or(BatchError::DateOverflow(start))?;
            let slot = DaySlot { target_date, day, days };

            let prompt = match plan_type {
                PlanType::Meal => self.prompts.meal_plan(&grounding, slot, targets.as_deref()),
                _ => self.prompts.workout_plan(&grounding, slot),
            }
            .map_err(|e| BatchError::Prompt(e.to_string()))?;

            let text = self
                .llm
                .generate_structured(&prompt)
                .await
                .map_err(|source| BatchError::Generation { day, source })?;
            let content = extract(&text).map_err(|source| BatchError::Extraction { day, source })?;
            if !has_plan_shape(plan_type, &content) {
                return Err(BatchError::Shape { day, plan_type });
            }

            debug!(day, %target_date, "generate_batch: day collected");
            collected.push((target_date, content));
        }
        Ok(collected)
    }
}
