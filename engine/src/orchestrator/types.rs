//! Orchestration data model
//!
//! Plans, assignments, parsed responses, and the aggregate turn result. All of
//! these are created once per incoming message and never mutated afterwards.

use crate::db::MemoryRecord;
use sdk::types::Phase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default confidence applied when the structured block is absent or the
/// reported value falls outside [0, 1]
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Derived complexity class of an incoming message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }
}

/// One planned speaking turn: which agent, what task, in what order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub agent_key: String,
    pub task: String,
    /// Ascending rank; 1 speaks first
    pub priority: u32,
}

/// Per-turn execution plan, immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationPlan {
    /// Discussion goals, ordered
    pub goals: Vec<String>,

    /// Ordered speaking assignments
    pub assignments: Vec<AgentAssignment>,

    /// Rounds the planner expects the discussion to take
    pub expected_rounds: u32,

    /// Free-text internal notes from the planner
    pub conductor_notes: String,

    /// Classifier verdict for this message
    pub complexity: Complexity,

    /// Whether a synthesis pass should run after the agents
    pub activate_conductor: bool,
}

/// Lifecycle status of an extracted tool call
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    #[default]
    Pending,
}

/// A tool invocation requested by an agent mid-response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Freshly generated id, unique within the turn
    pub id: String,

    /// Name of the requested tool
    pub tool: String,

    /// Argument map; inline markers carry at least a "context" entry
    pub arguments: BTreeMap<String, Value>,

    pub status: ToolCallStatus,
}

/// Typed record parsed from one agent's raw completion text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedAgentResponse {
    pub agent_key: String,
    pub agent_name: String,

    /// Prose with self-introductions, the structured block, and tool markers
    /// stripped out
    pub content: String,

    /// One-sentence stance
    pub stance: String,

    pub key_points: Vec<String>,

    /// Always within [0, 1]
    pub confidence: f64,

    pub tradeoffs: Vec<String>,

    pub next_action: String,

    pub tool_calls: Vec<ToolCallRequest>,
}

/// Output of one deliberation round as persisted on the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutput {
    pub round: u32,
    pub phase: Phase,
    pub responses: Vec<ParsedAgentResponse>,
    pub synthesis: Option<String>,
}

/// Aggregate result of one deliberation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationResult {
    pub plan: OrchestrationPlan,

    pub responses: Vec<ParsedAgentResponse>,

    pub synthesis: Option<String>,

    /// All tool calls across responses, flattened in speaking order
    pub tool_calls: Vec<ToolCallRequest>,

    /// Present when session persistence succeeded
    pub session_id: Option<String>,

    pub phase: Phase,

    pub round: u32,

    pub conductor_active: bool,

    /// Memory records written for this turn (empty on storage failure)
    pub memories_written: Vec<MemoryRecord>,
}
