//! UserStore - per-user state on SQLite
//!
//! Holds everything the coaching pipeline remembers about a user: the
//! biometric profile, a bounded chat transcript and bounded plan archives.
//!
//! # Layout
//!
//! ```text
//! users.db
//! ├── profiles       # one JSON document per user
//! ├── chat_history   # append-only turns, FIFO-evicted past capacity
//! └── plans          # one row per generated plan, grouped by (user, type)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use userstore::{PlanType, UserStore};
//!
//! let mut store = UserStore::open("users.db")?;
//! store.append_turn("u1", "hi", "hello!", userstore::DEFAULT_HISTORY_CAPACITY)?;
//! store.save_plan("u1", PlanType::Meal, &content, date, userstore::DEFAULT_PLAN_CAPACITY)?;
//! ```

pub mod cli;
pub mod config;
mod records;
mod store;

pub use records::{ConversationTurn, FitnessGoals, Plan, PlanMetadata, PlanType, UserProfile};
pub use store::{UserStore, now_ms};

/// Maximum number of chat turns retained per user
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Maximum number of plans retained per (user, plan type); six weeks of daily plans
pub const DEFAULT_PLAN_CAPACITY: usize = 42;
