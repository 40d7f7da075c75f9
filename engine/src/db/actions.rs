//! Pending-action persistence
//!
//! Every tool call surfaced by an agent during a turn becomes one pending
//! action row. The deliberation core only ever inserts; approval, rejection,
//! and execution happen downstream.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle status of a pending action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Approved => "approved",
            ActionStatus::Rejected => "rejected",
            ActionStatus::Executed => "executed",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "approved" => ActionStatus::Approved,
            "rejected" => ActionStatus::Rejected,
            "executed" => ActionStatus::Executed,
            _ => ActionStatus::Pending,
        }
    }
}

/// An action ready to be inserted
#[derive(Debug, Clone)]
pub struct NewAction {
    /// Id of the tool call request this action originates from
    pub tool_call_id: String,
    pub user_id: String,
    pub squad_id: Option<String>,
    pub agent_key: String,
    pub agent_name: String,
    pub action_type: String,
    pub label: String,
    /// Argument map serialized as JSON
    pub arguments: String,
    pub priority: i64,
}

/// A persisted pending action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    pub tool_call_id: String,
    pub user_id: String,
    pub squad_id: Option<String>,
    pub agent_key: String,
    pub agent_name: String,
    pub action_type: String,
    pub label: String,
    pub arguments: String,
    pub status: ActionStatus,
    pub priority: i64,
    pub created_at: i64,
}

/// Repository for pending actions
pub struct ActionRepository {
    pool: SqlitePool,
}

impl ActionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a batch of actions with status pending, returning the rows
    pub async fn insert_many(&self, actions: &[NewAction]) -> Result<Vec<PendingAction>> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        let mut records = Vec::with_capacity(actions.len());
        for action in actions {
            let id = uuid::Uuid::new_v4().to_string();

            sqlx::query(
                "INSERT INTO pending_actions \
                 (id, tool_call_id, user_id, squad_id, agent_key, agent_name, action_type, label, arguments, status, priority, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(&action.tool_call_id)
            .bind(&action.user_id)
            .bind(&action.squad_id)
            .bind(&action.agent_key)
            .bind(&action.agent_name)
            .bind(&action.action_type)
            .bind(&action.label)
            .bind(&action.arguments)
            .bind(ActionStatus::Pending.as_str())
            .bind(action.priority)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to insert pending action")?;

            records.push(PendingAction {
                id,
                tool_call_id: action.tool_call_id.clone(),
                user_id: action.user_id.clone(),
                squad_id: action.squad_id.clone(),
                agent_key: action.agent_key.clone(),
                agent_name: action.agent_name.clone(),
                action_type: action.action_type.clone(),
                label: action.label.clone(),
                arguments: action.arguments.clone(),
                status: ActionStatus::Pending,
                priority: action.priority,
                created_at: now,
            });
        }

        Ok(records)
    }

    /// List the most recent actions for a user, newest first
    pub async fn list_recent(&self, user_id: &str, limit: i64) -> Result<Vec<PendingAction>> {
        let rows = sqlx::query(
            "SELECT id, tool_call_id, user_id, squad_id, agent_key, agent_name, action_type, label, arguments, status, priority, created_at \
             FROM pending_actions \
             WHERE user_id = ? \
             ORDER BY created_at DESC \
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query pending actions")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.get("status");
            records.push(PendingAction {
                id: row.get("id"),
                tool_call_id: row.get("tool_call_id"),
                user_id: row.get("user_id"),
                squad_id: row.get("squad_id"),
                agent_key: row.get("agent_key"),
                agent_name: row.get("agent_name"),
                action_type: row.get("action_type"),
                label: row.get("label"),
                arguments: row.get("arguments"),
                status: ActionStatus::from_str(&status),
                priority: row.get("priority"),
                created_at: row.get("created_at"),
            });
        }

        Ok(records)
    }
}
