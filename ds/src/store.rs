//! Core DocStore implementation

use eyre::{Context, Result, eyre};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;
use tracing::{debug, info};

use crate::ingest::{SourceDoc, chunk_text, load_documents, load_food_records};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("static regex"));

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "for", "from", "how", "i", "in", "is", "it", "me", "my", "of", "on",
    "or", "the", "to", "what", "with",
];

/// Where a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// USDA food record
    Usda,
    /// Reference document
    Document,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usda => write!(f, "usda"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// Metadata for a single chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Unique chunk ID
    pub chunk_id: String,
    /// Source tag
    pub source: Source,
    /// Originating file path
    pub origin: String,
    /// Length in characters
    pub chars: usize,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

/// Inputs for building the index
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// JSON file of food records
    pub food_records: Option<PathBuf>,
    /// Glob patterns or directories of reference documents
    pub documents: Vec<String>,
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between food record chunks
    pub record_overlap: usize,
    /// Overlap between document chunks
    pub document_overlap: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            food_records: None,
            documents: Vec::new(),
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            record_overlap: crate::DEFAULT_RECORD_OVERLAP,
            document_overlap: crate::DEFAULT_DOCUMENT_OVERLAP,
        }
    }
}

/// A ranked query result
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub source: Source,
    pub text: String,
    pub score: f64,
}

/// Statistics for the index
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub chunk_count: usize,
    pub usda_chunks: usize,
    pub document_chunks: usize,
    pub total_chars: usize,
}

/// The local reference index
pub struct DocStore {
    base_path: PathBuf,
}

impl DocStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened doc store");
        Ok(Self { base_path })
    }

    fn index_path(&self) -> PathBuf {
        self.base_path.join("index.jsonl")
    }

    fn chunks_path(&self) -> PathBuf {
        self.base_path.join("chunks")
    }

    /// Whether an index has been built
    pub fn is_built(&self) -> bool {
        self.index_path().exists()
    }

    /// Rebuild the index from scratch
    ///
    /// Food records and documents are parsed on two threads; both must finish
    /// before anything is written.
    pub fn build(&self, options: &BuildOptions) -> Result<IndexStats> {
        let (records, documents) = thread::scope(|s| {
            let records = s.spawn(|| match &options.food_records {
                Some(path) => load_food_records(path),
                None => Ok(Vec::new()),
            });
            let documents = s.spawn(|| load_documents(&options.documents));

            let records = records.join().map_err(|_| eyre!("Food record parser panicked"));
            let documents = documents.join().map_err(|_| eyre!("Document parser panicked"));
            (records, documents)
        });
        let records: Vec<String> = records??;
        let documents: Vec<SourceDoc> = documents??;

        let chunks_path = self.chunks_path();
        if chunks_path.exists() {
            fs::remove_dir_all(&chunks_path)?;
        }
        fs::create_dir_all(&chunks_path)?;
        let mut index_file = fs::File::create(self.index_path())?;

        let origin = options
            .food_records
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut chunk_num = 0u32;
        for text in &records {
            for chunk in chunk_text(text, options.chunk_size, options.record_overlap) {
                chunk_num += 1;
                self.write_chunk(&mut index_file, chunk_num, Source::Usda, &origin, &chunk)?;
            }
        }
        for doc in &documents {
            let origin = doc.path.to_string_lossy().to_string();
            for chunk in chunk_text(&doc.text, options.chunk_size, options.document_overlap) {
                chunk_num += 1;
                self.write_chunk(&mut index_file, chunk_num, Source::Document, &origin, &chunk)?;
            }
        }

        info!(chunk_count = chunk_num, "Index build complete");
        self.stats()
    }

    fn write_chunk(
        &self,
        index_file: &mut fs::File,
        chunk_num: u32,
        source: Source,
        origin: &str,
        chunk: &str,
    ) -> Result<()> {
        let chunk_id = format!("{:04}", chunk_num);
        fs::write(self.chunks_path().join(format!("{}.txt", chunk_id)), chunk)?;

        let meta = ChunkMeta {
            chunk_id,
            source,
            origin: origin.to_string(),
            chars: chunk.chars().count(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        writeln!(index_file, "{}", serde_json::to_string(&meta)?)?;
        Ok(())
    }

    fn load_index(&self) -> Result<Vec<ChunkMeta>> {
        let index_path = self.index_path();
        if !index_path.exists() {
            return Err(eyre!("Index not built: {}", self.base_path.display()));
        }

        let reader = BufReader::new(fs::File::open(&index_path)?);
        let mut metas = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            metas.push(serde_json::from_str(&line)?);
        }
        Ok(metas)
    }

    /// Get the full content of a chunk
    pub fn get_chunk(&self, chunk_id: &str) -> Result<String> {
        let path = self.chunks_path().join(format!("{}.txt", chunk_id));
        fs::read_to_string(&path).context(format!("Chunk not found: {}", chunk_id))
    }

    /// Return up to `k` chunks ranked by descending relevance to `text`
    ///
    /// Relevance is term frequency weighted by inverse document frequency.
    /// Chunks sharing no term with the query are never returned.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        debug!(query_len = text.len(), k, "query: called");
        let metas = self.load_index()?;

        let terms: HashSet<String> = tokenize(text).into_iter().collect();
        if terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut chunks = Vec::with_capacity(metas.len());
        for meta in metas {
            let body = self.get_chunk(&meta.chunk_id)?;
            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokenize(&body) {
                if terms.contains(&token) {
                    *tf.entry(token).or_default() += 1;
                }
            }
            chunks.push((meta, body, tf));
        }

        let total = chunks.len() as f64;
        let idf: HashMap<&String, f64> = terms
            .iter()
            .map(|term| {
                let df = chunks.iter().filter(|(_, _, tf)| tf.contains_key(term)).count() as f64;
                (term, ((total + 1.0) / (df + 1.0)).ln() + 1.0)
            })
            .collect();

        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .filter_map(|(meta, body, tf)| {
                let score: f64 = tf.iter().map(|(term, count)| *count as f64 * idf[term]).sum();
                (score > 0.0).then(|| ScoredChunk {
                    chunk_id: meta.chunk_id,
                    source: meta.source,
                    text: body,
                    score,
                })
            })
            .collect();

        rank(&mut scored);
        scored.truncate(k);
        debug!(results = scored.len(), "query: ranked");
        Ok(scored)
    }

    /// Get statistics for the index
    pub fn stats(&self) -> Result<IndexStats> {
        let metas = self.load_index()?;
        Ok(IndexStats {
            chunk_count: metas.len(),
            usda_chunks: metas.iter().filter(|m| m.source == Source::Usda).count(),
            document_chunks: metas.iter().filter(|m| m.source == Source::Document).count(),
            total_chars: metas.iter().map(|m| m.chars).sum(),
        })
    }
}

/// Lowercase alphanumeric terms, minus stopwords and single characters
fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Descending score; ties go to the earlier chunk in build order
fn rank(scored: &mut [ScoredChunk]) {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| chunk_order(&a.chunk_id, &b.chunk_id))
    });
}

/// Chunk ids are zero-padded counters that widen past 9999
fn chunk_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_fixture(temp: &TempDir) -> DocStore {
        let records = temp.path().join("foods.json");
        fs::write(
            &records,
            r#"[
                {"name": "Chicken breast", "nutrients": [{"name": "Protein", "amount": "31", "unit": "G"}]},
                {"name": "Brown rice", "nutrients": [{"name": "Carbohydrate", "amount": "23", "unit": "G"}]}
            ]"#,
        )
        .unwrap();
        let docs = temp.path().join("refs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("guide.md"),
            "Protein needs rise with training. Protein at breakfast helps satiety.",
        )
        .unwrap();

        let store = DocStore::open(temp.path().join("store")).unwrap();
        store
            .build(&BuildOptions {
                food_records: Some(records),
                documents: vec![docs.to_string_lossy().to_string()],
                ..Default::default()
            })
            .unwrap();
        store
    }

    #[test]
    fn test_build_collects_both_sources() {
        let temp = TempDir::new().unwrap();
        let store = build_fixture(&temp);

        let stats = store.stats().unwrap();
        assert_eq!(stats.chunk_count, 3);
        assert_eq!(stats.usda_chunks, 2);
        assert_eq!(stats.document_chunks, 1);
    }

    #[test]
    fn test_query_ranks_by_relevance() {
        let temp = TempDir::new().unwrap();
        let store = build_fixture(&temp);

        let hits = store.query("protein for breakfast", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, Source::Document);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].text.contains("Chicken"));
    }

    #[test]
    fn test_query_respects_k_and_skips_unrelated() {
        let temp = TempDir::new().unwrap();
        let store = build_fixture(&temp);

        assert_eq!(store.query("protein", 1).unwrap().len(), 1);
        assert!(store.query("zucchini", 5).unwrap().is_empty());
        assert!(store.query("the and of", 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_without_index_fails() {
        let temp = TempDir::new().unwrap();
        let store = DocStore::open(temp.path()).unwrap();
        assert!(!store.is_built());
        assert!(store.query("protein", 5).is_err());
    }

    #[test]
    fn test_build_fails_on_bad_records() {
        let temp = TempDir::new().unwrap();
        let records = temp.path().join("bad.json");
        fs::write(&records, "not json").unwrap();

        let store = DocStore::open(temp.path().join("store")).unwrap();
        let result = store.build(&BuildOptions {
            food_records: Some(records),
            ..Default::default()
        });
        assert!(result.is_err());
        assert!(!store.is_built());
    }

    #[test]
    fn test_rank_ties_follow_chunk_number() {
        let chunk = |id: &str, score: f64| ScoredChunk {
            chunk_id: id.to_string(),
            source: Source::Document,
            text: String::new(),
            score,
        };
        let mut scored = vec![chunk("10000", 1.0), chunk("9999", 1.0), chunk("0002", 2.0), chunk("10001", 1.0)];
        rank(&mut scored);

        let ids: Vec<&str> = scored.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["0002", "9999", "10000", "10001"]);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("The Protein, in 2 eggs!"), vec!["protein", "eggs"]);
    }
}
