//! Bounded per-user plan archives

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use userstore::{Plan, PlanType};

use crate::state::{StateManager, StateResponse};

/// Plan collections capped at `capacity` plans per (user, type), never below one
#[derive(Clone)]
pub struct PlanStore {
    state: StateManager,
    capacity: usize,
}

impl PlanStore {
    pub fn new(state: StateManager, capacity: usize) -> Self {
        Self {
            state,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Save a plan; older plans beyond capacity are evicted in the same transaction
    pub async fn save(
        &self,
        user_id: &str,
        plan_type: PlanType,
        content: Value,
        target_date: NaiveDate,
    ) -> StateResponse<Plan> {
        debug!(%user_id, %plan_type, %target_date, "PlanStore::save: called");
        self.state
            .save_plan(user_id, plan_type, content, target_date, self.capacity)
            .await
    }

    /// Plans newest first
    pub async fn list(&self, user_id: &str, plan_type: PlanType) -> StateResponse<Vec<Plan>> {
        self.state.list_plans(user_id, plan_type).await
    }
}
