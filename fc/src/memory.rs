//! Bounded per-user conversation memory

use tracing::debug;

use userstore::ConversationTurn;

use crate::state::{StateManager, StateResponse};

/// Render turns as alternating `User:` / `Bot:` lines, oldest first
pub fn format_transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("User: {}\nBot: {}", t.user_input, t.bot_response))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Conversation log capped at `capacity` turns per user
#[derive(Clone)]
pub struct ConversationMemory {
    state: StateManager,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(state: StateManager, capacity: usize) -> Self {
        Self {
            state,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored turns, oldest first
    pub async fn turns(&self, user_id: &str) -> StateResponse<Vec<ConversationTurn>> {
        self.state.history(user_id).await
    }

    /// Formatted transcript; empty when the user has no history
    pub async fn get(&self, user_id: &str) -> StateResponse<String> {
        debug!(%user_id, "ConversationMemory::get: called");
        Ok(format_transcript(&self.turns(user_id).await?))
    }

    /// Record one exchange, evicting the oldest turns beyond capacity
    pub async fn append(&self, user_id: &str, user_input: &str, bot_response: &str) -> StateResponse<ConversationTurn> {
        debug!(%user_id, capacity = self.capacity, "ConversationMemory::append: called");
        self.state
            .append_turn(user_id, user_input, bot_response, self.capacity)
            .await
    }

    pub async fn clear(&self, user_id: &str) -> StateResponse<usize> {
        self.state.clear_history(user_id).await
    }
}
