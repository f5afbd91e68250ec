//! FitCoach - nutrition and fitness coaching pipeline
//!
//! Turns a free-text request into either a retrieval-grounded answer or a
//! generated meal/workout plan, while keeping bounded per-user conversation
//! history and plan archives.
//!
//! # Request flow
//!
//! ```text
//! query ─► classify ─┬─ general ──────► profile + context + history ─► generate
//!                    └─ meal/workout ─► [targets] + context ─► per day: generate ─► extract
//!                                                               └─► persist batch (all or none)
//! every response ─► conversation memory
//! ```
//!
//! # Modules
//!
//! - [`orchestrator`] - request state machine and plan batches
//! - [`intent`] - keyword and semantic intent classification
//! - [`retrieval`] - reference context from the document index
//! - [`llm`] - generation clients and the retrying wrapper
//! - [`extract`] - JSON recovery from generated text
//! - [`memory`] / [`plans`] - bounded per-user state over [`state`]
//! - [`config`] - configuration types and loading

pub mod cli;
pub mod composer;
pub mod config;
pub mod extract;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod nutrition;
pub mod orchestrator;
pub mod plans;
pub mod profile;
pub mod prompts;
pub mod repl;
pub mod request;
pub mod retrieval;
pub mod state;

pub use config::Config;
pub use extract::{ExtractionError, extract};
pub use intent::{ClassifierStrategy, Intent, IntentClassifier};
pub use llm::{LlmClient, LlmError, ResilientClient, RetryPolicy};
pub use orchestrator::{APOLOGY, Orchestrator, PipelineOptions};
pub use request::{QueryRequest, QueryResponse, RawQuery, ValidationError};
pub use retrieval::{ContextRetriever, DocumentIndex, RetrievedDocument};
