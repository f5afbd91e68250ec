//! Core UserStore implementation

use chrono::NaiveDate;
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::records::{ConversationTurn, Plan, PlanMetadata, PlanType, UserProfile};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS profiles (
    user_id    TEXT PRIMARY KEY,
    data       TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_history (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      TEXT NOT NULL,
    user_input   TEXT NOT NULL,
    bot_response TEXT NOT NULL,
    created_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_history_user ON chat_history(user_id, created_at, seq);

CREATE TABLE IF NOT EXISTS plans (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,
    user_id     TEXT NOT NULL,
    collection  TEXT NOT NULL,
    plan_type   TEXT NOT NULL,
    content     TEXT NOT NULL,
    target_date TEXT NOT NULL,
    metadata    TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_plans_collection ON plans(user_id, collection, created_at, seq);
";

/// Current time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// SQLite-backed per-user state
///
/// Timestamps are assigned here, never by callers. Rows that share a
/// millisecond are ordered by their insertion sequence.
pub struct UserStore {
    conn: Connection,
}

impl UserStore {
    /// Open or create a store at the given database path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }

        let conn = Connection::open(path).context(format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch(SCHEMA).context("Failed to initialize schema")?;

        debug!(path = %path.display(), "Opened user store");
        Ok(Self { conn })
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA).context("Failed to initialize schema")?;
        Ok(Self { conn })
    }

    // === Profiles ===

    /// Create or replace a user's profile
    pub fn put_profile(&mut self, user_id: &str, profile: &UserProfile) -> Result<()> {
        let data = serde_json::to_string(profile)?;
        self.conn.execute(
            "INSERT INTO profiles (user_id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![user_id, data, now_ms()],
        )?;
        info!(user_id, "Stored profile");
        Ok(())
    }

    /// Fetch a user's profile, `None` when the user has none
    pub fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(json) => {
                let profile = serde_json::from_str(&json).context(format!("Corrupt profile for user {}", user_id))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    // === Chat history ===

    /// Append a turn, evicting the oldest turns so that at most `capacity` remain
    pub fn append_turn(
        &mut self,
        user_id: &str,
        user_input: &str,
        bot_response: &str,
        capacity: usize,
    ) -> Result<ConversationTurn> {
        let tx = self.conn.transaction()?;

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM chat_history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let capacity = capacity.max(1) as i64;
        if count >= capacity {
            let excess = count - capacity + 1;
            let evicted = tx.execute(
                "DELETE FROM chat_history WHERE seq IN (
                     SELECT seq FROM chat_history WHERE user_id = ?1
                     ORDER BY created_at ASC, seq ASC LIMIT ?2
                 )",
                params![user_id, excess],
            )?;
            debug!(user_id, evicted, "Evicted oldest chat turns");
        }

        let created_at = now_ms();
        tx.execute(
            "INSERT INTO chat_history (user_id, user_input, bot_response, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, user_input, bot_response, created_at],
        )?;
        tx.commit()?;

        Ok(ConversationTurn {
            user_input: user_input.to_string(),
            bot_response: bot_response.to_string(),
            created_at,
        })
    }

    /// All turns for a user, oldest first
    pub fn history(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_input, bot_response, created_at FROM chat_history
             WHERE user_id = ?1 ORDER BY created_at ASC, seq ASC",
        )?;

        let turns = stmt
            .query_map(params![user_id], |row| {
                Ok(ConversationTurn {
                    user_input: row.get(0)?,
                    bot_response: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(turns)
    }

    /// Delete a user's entire chat history, returning the number of turns removed
    pub fn clear_history(&mut self, user_id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM chat_history WHERE user_id = ?1", params![user_id])?;
        info!(user_id, removed, "Cleared chat history");
        Ok(removed)
    }

    // === Plans ===

    /// Save a plan, then trim its collection to the `capacity` most recent plans (at least one)
    pub fn save_plan(
        &mut self,
        user_id: &str,
        plan_type: PlanType,
        content: &serde_json::Value,
        target_date: NaiveDate,
        capacity: usize,
    ) -> Result<Plan> {
        let plan = Plan {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            plan_type,
            content: content.clone(),
            created_at: now_ms(),
            target_date,
            metadata: PlanMetadata::default(),
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO plans (id, user_id, collection, plan_type, content, target_date, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                plan.id,
                plan.user_id,
                plan_type.collection(),
                plan_type.as_str(),
                serde_json::to_string(&plan.content)?,
                plan.target_date.format("%Y-%m-%d").to_string(),
                serde_json::to_string(&plan.metadata)?,
                plan.created_at,
            ],
        )?;

        // Newest first; everything past `capacity` goes
        let stale: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT seq FROM plans WHERE user_id = ?1 AND collection = ?2
                 ORDER BY created_at DESC, seq DESC",
            )?;
            let seqs = stmt
                .query_map(params![user_id, plan_type.collection()], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            seqs.into_iter().skip(capacity.max(1)).collect()
        };

        for seq in &stale {
            tx.execute("DELETE FROM plans WHERE seq = ?1", params![seq])?;
        }
        tx.commit()?;

        if !stale.is_empty() {
            debug!(user_id, collection = plan_type.collection(), evicted = stale.len(), "Evicted old plans");
        }
        info!(user_id, plan_id = %plan.id, %plan_type, %target_date, "Saved plan");
        Ok(plan)
    }

    /// Plans in a user's collection, newest first
    pub fn list_plans(&self, user_id: &str, plan_type: PlanType) -> Result<Vec<Plan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, plan_type, content, target_date, metadata, created_at FROM plans
             WHERE user_id = ?1 AND collection = ?2 ORDER BY created_at DESC, seq DESC",
        )?;

        let rows = stmt
            .query_map(params![user_id, plan_type.collection()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, user_id, kind, content, target_date, metadata, created_at)| {
                Ok(Plan {
                    plan_type: kind.parse().unwrap_or(PlanType::Other),
                    content: serde_json::from_str(&content).context(format!("Corrupt plan content: {}", id))?,
                    target_date: NaiveDate::parse_from_str(&target_date, "%Y-%m-%d")
                        .context(format!("Corrupt plan target date: {}", id))?,
                    metadata: serde_json::from_str(&metadata).unwrap_or_default(),
                    id,
                    user_id,
                    created_at,
                })
            })
            .collect()
    }

    /// Number of plans in a user's collection
    pub fn plan_count(&self, user_id: &str, plan_type: PlanType) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM plans WHERE user_id = ?1 AND collection = ?2",
            params![user_id, plan_type.collection()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
