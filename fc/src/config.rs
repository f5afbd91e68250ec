//! FitCoach configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::intent::ClassifierStrategy;
use crate::llm::RetryPolicy;

/// Main FitCoach configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation backend configuration
    pub llm: LlmConfig,

    /// Retry policy for generation calls
    pub retry: RetryConfig,

    /// Document index configuration
    pub retrieval: RetrievalConfig,

    /// Per-user state storage
    pub storage: StorageConfig,

    /// Request pipeline switches
    pub pipeline: PipelineConfig,

    /// Conversation memory limits
    pub memory: MemoryConfig,

    /// Plan archive limits
    pub plans: PlansConfig,

    /// Optional FoodData Central lookup
    pub nutrition: NutritionConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(eyre::eyre!("retry.max-attempts must be at least 1"));
        }
        if self.memory.capacity == 0 {
            return Err(eyre::eyre!("memory.capacity must be at least 1"));
        }
        if self.plans.capacity == 0 {
            return Err(eyre::eyre!("plans.capacity must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for path in Self::candidate_paths() {
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let read = |path: &Path| -> Option<String> {
            let content = fs::read_to_string(path).ok()?;
            let config: Self = serde_yaml::from_str(&content).ok()?;
            config.log_level
        };

        match config_path {
            Some(path) => read(path),
            None => Self::candidate_paths()
                .into_iter()
                .find(|p| p.exists())
                .and_then(|p| read(&p)),
        }
    }

    /// Project-local `.fitcoach.yml`, then `~/.config/fitcoach/fitcoach.yml`
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".fitcoach.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("fitcoach").join("fitcoach.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("gemini" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL; the provider's public endpoint when unset
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for conversational answers
    pub temperature: f32,

    /// Sampling temperature for JSON outputs (plans, targets, intent scores)
    #[serde(rename = "structured-temperature")]
    pub structured_temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-pro".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: None,
            max_tokens: 8192,
            temperature: 0.7,
            structured_temperature: 0.3,
            timeout_ms: 120_000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).context(format!("Environment variable {} not set", self.api_key_env))
    }

    /// Configured base URL, or the provider's default
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None if self.provider == "openai" => "https://api.openai.com".to_string(),
            None => "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Exponential backoff multiplier, in seconds
    pub multiplier: f64,

    #[serde(rename = "min-wait-secs")]
    pub min_wait_secs: u64,

    #[serde(rename = "max-wait-secs")]
    pub max_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: 2.0,
            min_wait_secs: 2,
            max_wait_secs: 60,
        }
    }
}

impl RetryConfig {
    /// Build the rate-limit retry policy this section describes
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            multiplier: self.multiplier,
            min_wait: Duration::from_secs(self.min_wait_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            ..Default::default()
        }
    }
}

/// Document index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Directory holding the docstore index
    #[serde(rename = "index-dir")]
    pub index_dir: PathBuf,

    /// Documents fetched per query
    #[serde(rename = "top-k")]
    pub top_k: usize,

    /// Documents included in a prompt
    #[serde(rename = "context-docs")]
    pub context_docs: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_dir: docstore::config::default_store_path(),
            top_k: docstore::DEFAULT_TOP_K,
            context_docs: 3,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database for profiles, history and plans
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: userstore::config::default_db_path(),
        }
    }
}

/// Request pipeline switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Intent classifier strategy ("keyword" or "semantic")
    pub classifier: ClassifierStrategy,

    /// Derive nutrient targets before generating meal plans
    #[serde(rename = "use-nutrient-targeting")]
    pub use_nutrient_targeting: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierStrategy::Keyword,
            use_nutrient_targeting: true,
        }
    }
}

/// Conversation memory limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Turns kept per user
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: userstore::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Plan archive limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlansConfig {
    /// Plans kept per (user, plan type)
    pub capacity: usize,
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            capacity: userstore::DEFAULT_PLAN_CAPACITY,
        }
    }
}

/// FoodData Central lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionConfig {
    pub enabled: bool,

    /// Environment variable containing the FoodData Central API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Foods returned per lookup
    #[serde(rename = "max-results")]
    pub max_results: usize,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key_env: "FDC_API_KEY".to_string(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            max_results: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.context_docs, 3);
        assert_eq!(config.memory.capacity, 20);
        assert_eq!(config.plans.capacity, 42);
        assert_eq!(config.pipeline.classifier, ClassifierStrategy::Keyword);
        assert!(config.pipeline.use_nutrient_targeting);
        assert!(!config.nutrition.enabled);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: openai
  model: gpt-4o
  api-key-env: OPENAI_API_KEY
  max-tokens: 4096
retry:
  max-attempts: 3
pipeline:
  classifier: semantic
  use-nutrient-targeting: false
memory:
  capacity: 10
log-level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.base_url(), "https://api.openai.com");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.multiplier, 2.0);
        assert_eq!(config.pipeline.classifier, ClassifierStrategy::Semantic);
        assert!(!config.pipeline.use_nutrient_targeting);
        assert_eq!(config.memory.capacity, 10);
        assert_eq!(config.plans.capacity, 42);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.min_wait, Duration::from_secs(2));
        assert_eq!(policy.max_wait, Duration::from_secs(60));
    }

    #[test]
    fn test_load_explicit_path_and_log_level() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fitcoach.yml");
        fs::write(&path, "log-level: WARN\nplans:\n  capacity: 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.plans.capacity, 7);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let missing = PathBuf::from("/nonexistent/fitcoach.yml");
        assert!(Config::load(Some(&missing)).is_err());
        assert!(Config::load_log_level(Some(&missing)).is_none());
    }

    #[test]
    #[serial]
    fn test_validate_requires_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "FITCOACH_TEST_KEY_UNSET".to_string();
        // SAFETY: serialized test, no other thread reads this variable
        unsafe { std::env::remove_var("FITCOACH_TEST_KEY_UNSET") };
        assert!(config.validate().is_err());

        config.llm.api_key_env = "FITCOACH_TEST_KEY_SET".to_string();
        unsafe { std::env::set_var("FITCOACH_TEST_KEY_SET", "secret") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.get_api_key().unwrap(), "secret");
        unsafe { std::env::remove_var("FITCOACH_TEST_KEY_SET") };
    }

    #[test]
    #[serial]
    fn test_validate_rejects_zero_capacities() {
        let mut config = Config::default();
        config.llm.api_key_env = "FITCOACH_TEST_KEY_CAPACITY".to_string();
        // SAFETY: serialized test, no other thread reads this variable
        unsafe { std::env::set_var("FITCOACH_TEST_KEY_CAPACITY", "secret") };

        config.plans.capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("plans.capacity"));

        config.plans.capacity = 42;
        config.memory.capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("memory.capacity"));

        config.memory.capacity = 20;
        assert!(config.validate().is_ok());
        unsafe { std::env::remove_var("FITCOACH_TEST_KEY_CAPACITY") };
    }
}
