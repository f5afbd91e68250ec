//! StateManager - actor that owns UserStore
//!
//! Processes commands via channels for thread-safe access to persistent state.

use std::path::Path;

use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use userstore::{ConversationTurn, Plan, PlanType, UserProfile, UserStore};

use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the database at `db_path`
    pub fn spawn(db_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(db_path = %db_path.as_ref().display(), "spawn: called");
        let store = UserStore::open(db_path.as_ref())?;
        Ok(Self::start(store))
    }

    /// Spawn a StateManager over a throwaway in-memory database
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        debug!("spawn_in_memory: called");
        Ok(Self::start(UserStore::open_in_memory()?))
    }

    fn start(store: UserStore) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Profiles ===

    /// Get a user's profile, if one was stored
    pub async fn get_profile(&self, user_id: &str) -> StateResponse<Option<UserProfile>> {
        debug!(%user_id, "get_profile: called");
        self.request(|reply| StateCommand::GetProfile {
            user_id: user_id.to_string(),
            reply,
        })
        .await
    }

    /// Insert or replace a user's profile
    pub async fn put_profile(&self, user_id: &str, profile: UserProfile) -> StateResponse<()> {
        debug!(%user_id, "put_profile: called");
        self.request(|reply| StateCommand::PutProfile {
            user_id: user_id.to_string(),
            profile: Box::new(profile),
            reply,
        })
        .await
    }

    // === Chat history ===

    /// All turns for a user, oldest first
    pub async fn history(&self, user_id: &str) -> StateResponse<Vec<ConversationTurn>> {
        debug!(%user_id, "history: called");
        self.request(|reply| StateCommand::History {
            user_id: user_id.to_string(),
            reply,
        })
        .await
    }

    /// Append a turn, keeping at most `capacity` turns for the user
    pub async fn append_turn(
        &self,
        user_id: &str,
        user_input: &str,
        bot_response: &str,
        capacity: usize,
    ) -> StateResponse<ConversationTurn> {
        debug!(%user_id, capacity, "append_turn: called");
        self.request(|reply| StateCommand::AppendTurn {
            user_id: user_id.to_string(),
            user_input: user_input.to_string(),
            bot_response: bot_response.to_string(),
            capacity,
            reply,
        })
        .await
    }

    /// Delete every turn for a user, returning how many were removed
    pub async fn clear_history(&self, user_id: &str) -> StateResponse<usize> {
        debug!(%user_id, "clear_history: called");
        self.request(|reply| StateCommand::ClearHistory {
            user_id: user_id.to_string(),
            reply,
        })
        .await
    }

    // === Plans ===

    /// Save a plan, keeping at most `capacity` plans in its collection
    pub async fn save_plan(
        &self,
        user_id: &str,
        plan_type: PlanType,
        content: Value,
        target_date: NaiveDate,
        capacity: usize,
    ) -> StateResponse<Plan> {
        debug!(%user_id, %plan_type, %target_date, "save_plan: called");
        self.request(|reply| StateCommand::SavePlan {
            user_id: user_id.to_string(),
            plan_type,
            content,
            target_date,
            capacity,
            reply,
        })
        .await
    }

    /// Plans in a user's collection, newest first
    pub async fn list_plans(&self, user_id: &str, plan_type: PlanType) -> StateResponse<Vec<Plan>> {
        debug!(%user_id, %plan_type, "list_plans: called");
        self.request(|reply| StateCommand::ListPlans {
            user_id: user_id.to_string(),
            plan_type,
            reply,
        })
        .await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

fn store_err(e: eyre::Report) -> StateError {
    StateError::StoreError(format!("{:#}", e))
}

/// The actor loop that processes commands
async fn actor_loop(mut store: UserStore, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::GetProfile { user_id, reply } => {
                debug!(%user_id, "actor_loop: GetProfile command");
                let _ = reply.send(store.get_profile(&user_id).map_err(store_err));
            }

            StateCommand::PutProfile { user_id, profile, reply } => {
                debug!(%user_id, "actor_loop: PutProfile command");
                let _ = reply.send(store.put_profile(&user_id, &profile).map_err(store_err));
            }

            StateCommand::History { user_id, reply } => {
                debug!(%user_id, "actor_loop: History command");
                let _ = reply.send(store.history(&user_id).map_err(store_err));
            }

            StateCommand::AppendTurn {
                user_id,
                user_input,
                bot_response,
                capacity,
                reply,
            } => {
                debug!(%user_id, "actor_loop: AppendTurn command");
                let result = store
                    .append_turn(&user_id, &user_input, &bot_response, capacity)
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ClearHistory { user_id, reply } => {
                debug!(%user_id, "actor_loop: ClearHistory command");
                let _ = reply.send(store.clear_history(&user_id).map_err(store_err));
            }

            StateCommand::SavePlan {
                user_id,
                plan_type,
                content,
                target_date,
                capacity,
                reply,
            } => {
                debug!(%user_id, %plan_type, "actor_loop: SavePlan command");
                let result = store
                    .save_plan(&user_id, plan_type, &content, target_date, capacity)
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListPlans {
                user_id,
                plan_type,
                reply,
            } => {
                debug!(%user_id, %plan_type, "actor_loop: ListPlans command");
                let _ = reply.send(store.list_plans(&user_id, plan_type).map_err(store_err));
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_manager_profile_roundtrip() {
        let manager = StateManager::spawn_in_memory().unwrap();

        assert!(manager.get_profile("u1").await.unwrap().is_none());

        let profile = UserProfile {
            name: Some("Sam".to_string()),
            age: Some(41),
            ..Default::default()
        };
        manager.put_profile("u1", profile.clone()).await.unwrap();

        assert_eq!(manager.get_profile("u1").await.unwrap(), Some(profile));
        assert!(manager.get_profile("u2").await.unwrap().is_none());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_manager_history_capacity() {
        let manager = StateManager::spawn_in_memory().unwrap();

        for i in 0..5 {
            manager
                .append_turn("u1", &format!("q{}", i), &format!("a{}", i), 3)
                .await
                .unwrap();
        }

        let turns = manager.history("u1").await.unwrap();
        let inputs: Vec<_> = turns.iter().map(|t| t.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["q2", "q3", "q4"]);

        assert_eq!(manager.clear_history("u1").await.unwrap(), 3);
        assert!(manager.history("u1").await.unwrap().is_empty());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_manager_plans_persist_on_disk() {
        let temp = tempdir().unwrap();
        let db = temp.path().join("users.db");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let manager = StateManager::spawn(&db).unwrap();
        let plan = manager
            .save_plan("u1", PlanType::Workout, json!([{"exercise": "Walk"}]), date, 42)
            .await
            .unwrap();
        assert_eq!(plan.target_date, date);
        manager.shutdown().await.unwrap();

        let reopened = StateManager::spawn(&db).unwrap();
        let plans = reopened.list_plans("u1", PlanType::Workout).await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, plan.id);
        assert!(reopened.list_plans("u1", PlanType::Meal).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_manager_after_shutdown() {
        let manager = StateManager::spawn_in_memory().unwrap();
        manager.shutdown().await.unwrap();
        // Give the actor a chance to exit
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let result = manager.history("u1").await;
        assert!(matches!(result, Err(StateError::ChannelError)));
    }
}
