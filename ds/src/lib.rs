//! DocStore - local nutrition reference index
//!
//! Turns USDA-style food records and plain-text reference documents into
//! chunks on disk and answers ranked keyword queries over them.
//!
//! # Architecture
//!
//! ```text
//! .docstore/
//! ├── index.jsonl      # chunk metadata, one JSON object per line
//! └── chunks/
//!     ├── 0001.txt
//!     ├── 0002.txt
//!     └── ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docstore::{BuildOptions, DocStore};
//!
//! let store = DocStore::open(".docstore")?;
//! store.build(&BuildOptions {
//!     food_records: Some("usda_food_data.json".into()),
//!     documents: vec!["references/**/*.md".to_string()],
//!     ..Default::default()
//! })?;
//! let hits = store.query("high protein breakfast", 5)?;
//! ```

pub mod cli;
pub mod config;
mod ingest;
mod store;

pub use ingest::{FoodRecord, Nutrient, SourceDoc, chunk_text, load_documents, load_food_records};
pub use store::{BuildOptions, ChunkMeta, DocStore, IndexStats, ScoredChunk, Source};

/// Default chunk size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap between adjacent chunks of a food record
pub const DEFAULT_RECORD_OVERLAP: usize = 20;

/// Overlap between adjacent chunks of a reference document
pub const DEFAULT_DOCUMENT_OVERLAP: usize = 0;

/// Default number of results per query
pub const DEFAULT_TOP_K: usize = 5;
