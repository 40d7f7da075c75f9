//! Agent memory persistence
//!
//! Append-only store of per-agent fact and preference fragments, scoped to a
//! user and optionally a squad. The executor reads the top-N most important
//! records back into each agent's prompt on later turns.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of a memory fragment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Fact,
    Preference,
}

impl MemoryKind {
    pub fn as_str(&self) -> &str {
        match self {
            MemoryKind::Fact => "fact",
            MemoryKind::Preference => "preference",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "preference" => MemoryKind::Preference,
            _ => MemoryKind::Fact,
        }
    }
}

/// A memory fragment ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub agent_key: String,
    pub user_id: String,
    pub squad_id: Option<String>,
    pub kind: MemoryKind,
    pub content: String,
    pub importance: f64,
}

/// A persisted memory record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub agent_key: String,
    pub user_id: String,
    pub squad_id: Option<String>,
    pub kind: MemoryKind,
    pub content: String,
    pub importance: f64,
    pub created_at: i64,
}

/// Repository for agent memories
pub struct MemoryRepository {
    pool: SqlitePool,
}

impl MemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a batch of memories, returning the persisted records
    pub async fn insert_many(&self, memories: &[NewMemory]) -> Result<Vec<MemoryRecord>> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        let mut records = Vec::with_capacity(memories.len());
        for memory in memories {
            let id = uuid::Uuid::new_v4().to_string();

            sqlx::query(
                "INSERT INTO agent_memories \
                 (id, agent_key, user_id, squad_id, kind, content, importance, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&memory.agent_key)
            .bind(&memory.user_id)
            .bind(&memory.squad_id)
            .bind(memory.kind.as_str())
            .bind(&memory.content)
            .bind(memory.importance)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to insert memory record")?;

            records.push(MemoryRecord {
                id,
                agent_key: memory.agent_key.clone(),
                user_id: memory.user_id.clone(),
                squad_id: memory.squad_id.clone(),
                kind: memory.kind,
                content: memory.content.clone(),
                importance: memory.importance,
                created_at: now,
            });
        }

        Ok(records)
    }

    /// Fetch the top-N memories for one agent by importance descending.
    ///
    /// With a squad id, only squad-scoped records match; without one, only
    /// records with no squad.
    pub async fn top_by_importance(
        &self,
        agent_key: &str,
        user_id: &str,
        squad_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<MemoryRecord>> {
        let rows = match squad_id {
            Some(squad) => {
                sqlx::query(
                    "SELECT id, agent_key, user_id, squad_id, kind, content, importance, created_at \
                     FROM agent_memories \
                     WHERE agent_key = ? AND user_id = ? AND squad_id = ? \
                     ORDER BY importance DESC, created_at DESC \
                     LIMIT ?",
                )
                .bind(agent_key)
                .bind(user_id)
                .bind(squad)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, agent_key, user_id, squad_id, kind, content, importance, created_at \
                     FROM agent_memories \
                     WHERE agent_key = ? AND user_id = ? AND squad_id IS NULL \
                     ORDER BY importance DESC, created_at DESC \
                     LIMIT ?",
                )
                .bind(agent_key)
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to query agent memories")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("kind");
            records.push(MemoryRecord {
                id: row.get("id"),
                agent_key: row.get("agent_key"),
                user_id: row.get("user_id"),
                squad_id: row.get("squad_id"),
                kind: MemoryKind::from_str(&kind),
                content: row.get("content"),
                importance: row.get("importance"),
                created_at: row.get("created_at"),
            });
        }

        Ok(records)
    }
}
