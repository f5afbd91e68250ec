//! Context retrieval from the nutrition reference index
//!
//! Retrieval is best-effort: a failing index degrades to an empty context
//! and is never retried.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docstore::DocStore;
use thiserror::Error;
use tracing::{debug, warn};

/// Rendered in place of context when nothing relevant was found
pub const NO_CONTEXT: &str = "No relevant information found in the nutrition references.";

const CONTEXT_HEADER: &str =
    "Here is some information from your nutrition references and USDA food data that might help:";

/// A retrieved reference passage
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub text: String,
    /// Where the passage came from (`usda`, `document`, ...)
    pub source: String,
}

/// Errors from the document index
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Ranked similarity search over reference passages
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Up to `k` documents, most similar first
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedDocument>, RetrievalError>;
}

/// [`DocumentIndex`] over an on-disk docstore
pub struct LocalIndex {
    store: Arc<DocStore>,
}

impl LocalIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RetrievalError> {
        debug!(path = %path.as_ref().display(), "LocalIndex::open: called");
        let store = DocStore::open(path).map_err(|e| RetrievalError::Unavailable(format!("{:#}", e)))?;
        Ok(Self { store: Arc::new(store) })
    }
}

#[async_trait]
impl DocumentIndex for LocalIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        debug!(k, "LocalIndex::query: called");
        let store = Arc::clone(&self.store);
        let text = text.to_string();

        let hits = tokio::task::spawn_blocking(move || store.query(&text, k))
            .await
            .map_err(|e| RetrievalError::Query(e.to_string()))?
            .map_err(|e| RetrievalError::Query(format!("{:#}", e)))?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedDocument {
                text: hit.text,
                source: hit.source.to_string(),
            })
            .collect())
    }
}

/// Fetches and renders reference context for prompts
#[derive(Clone)]
pub struct ContextRetriever {
    index: Arc<dyn DocumentIndex>,
    top_k: usize,
    context_docs: usize,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn DocumentIndex>, top_k: usize, context_docs: usize) -> Self {
        Self {
            index,
            top_k,
            context_docs,
        }
    }

    /// Top-k documents for `query`; empty when the index fails
    pub async fn retrieve(&self, query: &str) -> Vec<RetrievedDocument> {
        debug!(top_k = self.top_k, "retrieve: called");
        match self.index.query(query, self.top_k).await {
            Ok(docs) => {
                debug!(count = docs.len(), "retrieve: documents found");
                docs
            }
            Err(e) => {
                warn!(error = %e, "retrieve: index query failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// Context block from the best `context_docs` documents
    pub fn render(&self, docs: &[RetrievedDocument]) -> String {
        if docs.is_empty() {
            return NO_CONTEXT.to_string();
        }
        let joined = docs
            .iter()
            .take(self.context_docs)
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}\n{}", CONTEXT_HEADER, joined)
    }

    /// Retrieve and render in one step
    pub async fn context_for(&self, query: &str) -> String {
        let docs = self.retrieve(query).await;
        self.render(&docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::BuildOptions;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedIndex {
        docs: Vec<&'static str>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl DocumentIndex for FixedIndex {
        async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedDocument>, RetrievalError> {
            self.queries.lock().unwrap().push((text.to_string(), k));
            Ok(self
                .docs
                .iter()
                .take(k)
                .map(|t| RetrievedDocument {
                    text: t.to_string(),
                    source: "document".to_string(),
                })
                .collect())
        }
    }

    struct BrokenIndex;

    #[async_trait]
    impl DocumentIndex for BrokenIndex {
        async fn query(&self, _text: &str, _k: usize) -> Result<Vec<RetrievedDocument>, RetrievalError> {
            Err(RetrievalError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_render_top_documents() {
        let index = Arc::new(FixedIndex {
            docs: vec!["one", "two", "three", "four", "five", "six"],
            queries: Mutex::new(Vec::new()),
        });
        let retriever = ContextRetriever::new(index.clone(), 5, 3);

        let docs = retriever.retrieve("oats").await;
        assert_eq!(docs.len(), 5);
        assert_eq!(index.queries.lock().unwrap()[0], ("oats".to_string(), 5));

        let context = retriever.render(&docs);
        assert!(context.ends_with("\none two three"));
        assert!(!context.contains("four"));
    }

    #[tokio::test]
    async fn test_failing_index_degrades_to_sentinel() {
        let retriever = ContextRetriever::new(Arc::new(BrokenIndex), 5, 3);
        assert!(retriever.retrieve("oats").await.is_empty());
        assert_eq!(retriever.context_for("oats").await, NO_CONTEXT);
    }

    #[tokio::test]
    async fn test_local_index_over_docstore() {
        let temp = TempDir::new().unwrap();
        let refs = temp.path().join("refs");
        std::fs::create_dir_all(&refs).unwrap();
        std::fs::write(refs.join("oats.md"), "Rolled oats are a whole grain breakfast staple.").unwrap();
        std::fs::write(refs.join("squat.md"), "Squats train the legs and glutes.").unwrap();

        let store_dir = temp.path().join("index");
        DocStore::open(&store_dir)
            .unwrap()
            .build(&BuildOptions {
                documents: vec![refs.to_string_lossy().to_string()],
                ..Default::default()
            })
            .unwrap();

        let index = LocalIndex::open(&store_dir).unwrap();
        let docs = index.query("oats breakfast", 5).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.contains("Rolled oats"));
        assert_eq!(docs[0].source, "document");
    }

    #[tokio::test]
    async fn test_local_index_unbuilt_is_error() {
        let temp = TempDir::new().unwrap();
        let index = LocalIndex::open(temp.path().join("empty")).unwrap();
        assert!(index.query("oats", 5).await.is_err());

        let retriever = ContextRetriever::new(Arc::new(index), 5, 3);
        assert_eq!(retriever.context_for("oats").await, NO_CONTEXT);
    }
}
