//! Configuration for userstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database
    #[serde(default = "default_db_path", rename = "db-path")]
    pub db_path: PathBuf,

    /// Chat turns kept per user
    #[serde(default = "default_history_capacity", rename = "history-capacity")]
    pub history_capacity: usize,

    /// Plans kept per (user, plan type)
    #[serde(default = "default_plan_capacity", rename = "plan-capacity")]
    pub plan_capacity: usize,
}

/// Default database location (~/.local/share/fitcoach/users.db on Linux)
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcoach")
        .join("users.db")
}

fn default_history_capacity() -> usize {
    crate::DEFAULT_HISTORY_CAPACITY
}

fn default_plan_capacity() -> usize {
    crate::DEFAULT_PLAN_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            history_capacity: default_history_capacity(),
            plan_capacity: default_plan_capacity(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("fitcoach").join("userstore.yml")),
            Some(PathBuf::from("userstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.plan_capacity, 42);
        assert!(config.db_path.ends_with("users.db"));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("userstore.yml");
        let config = Config {
            db_path: temp.path().join("x.db"),
            history_capacity: 5,
            plan_capacity: 7,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.history_capacity, 5);
        assert_eq!(loaded.plan_capacity, 7);
        assert_eq!(loaded.db_path, temp.path().join("x.db"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("history-capacity: 3\n").unwrap();
        assert_eq!(config.history_capacity, 3);
        assert_eq!(config.plan_capacity, 42);
    }
}
