//! Source parsing: food records and reference documents

use eyre::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// One nutrient line of a food record; amounts may arrive as strings or numbers
#[derive(Debug, Clone, Deserialize)]
pub struct Nutrient {
    pub name: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub unit: Option<String>,
}

/// A food item exported from the USDA FoodData tables
#[derive(Debug, Clone, Deserialize)]
pub struct FoodRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
}

impl FoodRecord {
    /// Render the record as indexable text
    pub fn to_text(&self) -> String {
        let mut text = format!("Food: {}\n", self.name.as_deref().unwrap_or("N/A"));
        if !self.nutrients.is_empty() {
            let lines: Vec<String> = self
                .nutrients
                .iter()
                .map(|n| {
                    let amount = match &n.amount {
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(v) if !v.is_null() => v.to_string(),
                        _ => "N/A".to_string(),
                    };
                    format!(
                        "{}: {} {}",
                        n.name.as_deref().unwrap_or("N/A"),
                        amount,
                        n.unit.as_deref().unwrap_or("")
                    )
                    .trim_end()
                    .to_string()
                })
                .collect();
            text.push_str("Nutrients:\n");
            text.push_str(&lines.join("\n"));
        }
        text
    }
}

/// A reference document read from disk
#[derive(Debug, Clone)]
pub struct SourceDoc {
    pub path: PathBuf,
    pub text: String,
}

/// Load a JSON array of food records and render each as text
pub fn load_food_records(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).context(format!("Failed to read food records: {}", path.display()))?;
    let records: Vec<FoodRecord> =
        serde_json::from_str(&content).context(format!("Invalid food record file: {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "Loaded food records");
    Ok(records.iter().map(FoodRecord::to_text).collect())
}

/// Load text documents from glob patterns or directories
///
/// Directories are walked recursively for `.txt` and `.md` files.
pub fn load_documents(patterns: &[String]) -> Result<Vec<SourceDoc>> {
    let mut docs = Vec::new();

    for pattern in patterns {
        let root = Path::new(pattern);
        if root.is_dir() {
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = entry?;
                let path = entry.path();
                let is_text = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e, "txt" | "md"))
                    .unwrap_or(false);
                if entry.file_type().is_file() && is_text {
                    docs.push(read_doc(path)?);
                }
            }
            continue;
        }

        let paths = glob::glob(pattern).context(format!("Invalid glob pattern: {}", pattern))?;
        for entry in paths {
            let path = entry?;
            if path.is_file() {
                docs.push(read_doc(&path)?);
            }
        }
    }

    info!(count = docs.len(), "Loaded reference documents");
    Ok(docs)
}

fn read_doc(path: &Path) -> Result<SourceDoc> {
    debug!(path = %path.display(), "read_doc: called");
    let text = fs::read_to_string(path).context(format!("Failed to read file: {}", path.display()))?;
    Ok(SourceDoc {
        path: path.to_path_buf(),
        text,
    })
}

/// Split text into chunks of `size` characters with `overlap` shared between neighbours
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
