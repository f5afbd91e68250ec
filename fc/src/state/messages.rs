//! State manager messages
//!
//! Commands and responses for the actor pattern.

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use userstore::{ConversationTurn, Plan, PlanType, UserProfile};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Profiles
    GetProfile {
        user_id: String,
        reply: oneshot::Sender<StateResponse<Option<UserProfile>>>,
    },
    PutProfile {
        user_id: String,
        profile: Box<UserProfile>,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Chat history
    History {
        user_id: String,
        reply: oneshot::Sender<StateResponse<Vec<ConversationTurn>>>,
    },
    AppendTurn {
        user_id: String,
        user_input: String,
        bot_response: String,
        capacity: usize,
        reply: oneshot::Sender<StateResponse<ConversationTurn>>,
    },
    ClearHistory {
        user_id: String,
        reply: oneshot::Sender<StateResponse<usize>>,
    },

    // Plans
    SavePlan {
        user_id: String,
        plan_type: PlanType,
        content: Value,
        target_date: NaiveDate,
        capacity: usize,
        reply: oneshot::Sender<StateResponse<Plan>>,
    },
    ListPlans {
        user_id: String,
        plan_type: PlanType,
        reply: oneshot::Sender<StateResponse<Vec<Plan>>>,
    },

    // Shutdown
    Shutdown,
}
