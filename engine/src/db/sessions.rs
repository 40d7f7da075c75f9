//! Orchestration session persistence
//!
//! One session row is created per incoming message (round 1). List-valued
//! columns (agent keys, goals, tasks, round outputs) are stored as JSON text;
//! the schema supports multi-round extension even though the current driver
//! always produces exactly one round per call.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};

/// A session ready to be inserted
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub squad_id: Option<String>,
    pub context_id: Option<String>,
    pub session_type: String,
    pub round: i64,
    pub phase: String,
    pub agent_keys: Vec<String>,
    pub goals: Vec<String>,
    pub tasks: Vec<String>,
    /// Per-round outputs serialized as JSON
    pub round_outputs: String,
    pub conductor_notes: String,
    pub active: bool,
}

/// A persisted session row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub squad_id: Option<String>,
    pub context_id: Option<String>,
    pub session_type: String,
    pub round: i64,
    pub phase: String,
    pub agent_keys: Vec<String>,
    pub goals: Vec<String>,
    pub tasks: Vec<String>,
    pub round_outputs: String,
    pub conductor_notes: String,
    pub active: bool,
    pub created_at: i64,
}

/// Repository for orchestration sessions
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a session, returning the persisted row with its generated id
    pub async fn insert(&self, session: &NewSession) -> Result<SessionRow> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
        let id = uuid::Uuid::new_v4().to_string();

        let agent_keys_json = serde_json::to_string(&session.agent_keys)?;
        let goals_json = serde_json::to_string(&session.goals)?;
        let tasks_json = serde_json::to_string(&session.tasks)?;

        sqlx::query(
            "INSERT INTO orchestration_sessions \
             (id, user_id, squad_id, context_id, session_type, round, phase, agent_keys, goals, tasks, round_outputs, conductor_notes, active, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&session.user_id)
        .bind(&session.squad_id)
        .bind(&session.context_id)
        .bind(&session.session_type)
        .bind(session.round)
        .bind(&session.phase)
        .bind(&agent_keys_json)
        .bind(&goals_json)
        .bind(&tasks_json)
        .bind(&session.round_outputs)
        .bind(&session.conductor_notes)
        .bind(session.active)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to insert orchestration session")?;

        Ok(SessionRow {
            id,
            user_id: session.user_id.clone(),
            squad_id: session.squad_id.clone(),
            context_id: session.context_id.clone(),
            session_type: session.session_type.clone(),
            round: session.round,
            phase: session.phase.clone(),
            agent_keys: session.agent_keys.clone(),
            goals: session.goals.clone(),
            tasks: session.tasks.clone(),
            round_outputs: session.round_outputs.clone(),
            conductor_notes: session.conductor_notes.clone(),
            active: session.active,
            created_at: now,
        })
    }

    /// List the most recent sessions for a user, newest first
    pub async fn list_recent(&self, user_id: &str, limit: i64) -> Result<Vec<SessionRow>> {
        let rows = sqlx::query(
            "SELECT id, user_id, squad_id, context_id, session_type, round, phase, agent_keys, goals, tasks, round_outputs, conductor_notes, active, created_at \
             FROM orchestration_sessions \
             WHERE user_id = ? \
             ORDER BY created_at DESC \
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query orchestration sessions")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(Self::row_to_session(&row)?);
        }

        Ok(records)
    }

    /// Fetch one session by id
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let row = sqlx::query(
            "SELECT id, user_id, squad_id, context_id, session_type, round, phase, agent_keys, goals, tasks, round_outputs, conductor_notes, active, created_at \
             FROM orchestration_sessions \
             WHERE id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query orchestration session")?;

        row.map(|r| Self::row_to_session(&r)).transpose()
    }

    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRow> {
        let agent_keys_json: String = row.get("agent_keys");
        let goals_json: String = row.get("goals");
        let tasks_json: String = row.get("tasks");

        Ok(SessionRow {
            id: row.get("id"),
            user_id: row.get("user_id"),
            squad_id: row.get("squad_id"),
            context_id: row.get("context_id"),
            session_type: row.get("session_type"),
            round: row.get("round"),
            phase: row.get("phase"),
            agent_keys: serde_json::from_str(&agent_keys_json).unwrap_or_default(),
            goals: serde_json::from_str(&goals_json).unwrap_or_default(),
            tasks: serde_json::from_str(&tasks_json).unwrap_or_default(),
            round_outputs: row.get("round_outputs"),
            conductor_notes: row.get("conductor_notes"),
            active: row.get("active"),
            created_at: row.get("created_at"),
        })
    }
}
