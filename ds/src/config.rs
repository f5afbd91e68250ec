//! Configuration for docstore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the index directory
    #[serde(default = "default_store_path", rename = "store-path")]
    pub store_path: PathBuf,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size", rename = "chunk-size")]
    pub chunk_size: usize,

    /// Overlap between food record chunks
    #[serde(default = "default_record_overlap", rename = "record-overlap")]
    pub record_overlap: usize,

    /// Overlap between document chunks
    #[serde(default = "default_document_overlap", rename = "document-overlap")]
    pub document_overlap: usize,
}

/// Default index location (~/.local/share/fitcoach/docstore on Linux)
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcoach")
        .join("docstore")
}

fn default_chunk_size() -> usize {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_record_overlap() -> usize {
    crate::DEFAULT_RECORD_OVERLAP
}

fn default_document_overlap() -> usize {
    crate::DEFAULT_DOCUMENT_OVERLAP
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            chunk_size: default_chunk_size(),
            record_overlap: default_record_overlap(),
            document_overlap: default_document_overlap(),
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
            dirs::config_dir().map(|p| p.join("fitcoach").join("docstore.yml")),
            Some(PathBuf::from("docstore.yml")),
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

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.record_overlap, 20);
        assert_eq!(config.document_overlap, 0);
    }

    #[test]
    fn test_kebab_case_keys() {
        let config: Config = serde_yaml::from_str("chunk-size: 500\nstore-path: /tmp/refs\n").unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.store_path, PathBuf::from("/tmp/refs"));
        assert_eq!(config.record_overlap, 20);
    }
}
