//! Conversation history repository (read-only)
//!
//! The surrounding application writes conversation turns; the planner reads a
//! bounded recent window back for context when the caller does not supply
//! history inline.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

/// One recorded conversation turn
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

/// Repository for reading recent conversation history
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the most recent turns for a user, returned oldest first
    pub async fn recent(
        &self,
        user_id: &str,
        squad_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ConversationRecord>> {
        let rows = match squad_id {
            Some(squad) => {
                sqlx::query(
                    "SELECT role, content, created_at FROM conversation_turns \
                     WHERE user_id = ? AND squad_id = ? \
                     ORDER BY created_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(squad)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT role, content, created_at FROM conversation_turns \
                     WHERE user_id = ? \
                     ORDER BY created_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to query conversation history")?;

        let mut records: Vec<ConversationRecord> = rows
            .into_iter()
            .map(|row| ConversationRecord {
                role: row.get("role"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
            .collect();

        // Query is newest-first for the LIMIT; callers want chronological order
        records.reverse();

        Ok(records)
    }
}
