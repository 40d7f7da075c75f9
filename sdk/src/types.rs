//! Deliberation contract types
//!
//! These types form the inbound contract of the engine: the caller supplies a
//! roster of agent descriptors alongside the user's message, and receives
//! parsed agent responses back. Descriptors are per-request input — the engine
//! never registers or stores them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the deliberation state machine
///
/// The phase shapes the instruction given to each agent: propose first,
/// critique what was proposed, then reconcile toward a recommendation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Agents put forward their own position
    #[default]
    Proposal,

    /// Agents challenge the positions already on the table
    Critique,

    /// Agents converge on a joint recommendation
    Reconciliation,
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Proposal => "proposal",
            Phase::Critique => "critique",
            Phase::Reconciliation => "reconciliation",
        }
    }

    /// Parse a phase name, defaulting to proposal for unknown values
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critique" => Phase::Critique,
            "reconciliation" => Phase::Reconciliation,
            _ => Phase::Proposal,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How much output the caller wants from each agent
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// A few sentences
    Short,

    /// Prose plus the embedded structured block
    #[default]
    Structured,

    /// Full reasoning, trade-offs spelled out
    Detailed,
}

impl ResponseMode {
    /// Parse a mode name, defaulting to structured for unknown values
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "short" => ResponseMode::Short,
            "detailed" => ResponseMode::Detailed,
            _ => ResponseMode::Structured,
        }
    }
}

/// Per-agent generation parameters for completion calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    /// Hard cap on output tokens for this agent
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.7
}

/// Immutable per-turn description of one deliberating agent
///
/// Supplied fresh on every call by the frontend that owns agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique key identifying the agent within the roster
    pub key: String,

    /// Display name shown to users and to other agents
    pub name: String,

    /// Specialty label (e.g. "backend", "growth", "design")
    #[serde(default)]
    pub specialty: String,

    /// Base role instructions injected verbatim into the system prompt
    pub role_instructions: String,

    /// Decision style tag (e.g. "data-driven", "contrarian")
    #[serde(default)]
    pub decision_style: String,

    /// Ordered list of what this agent optimizes for, highest first
    #[serde(default)]
    pub priorities: Vec<String>,

    /// Known bias worth disclosing to the agent itself
    #[serde(default)]
    pub bias_note: Option<String>,

    /// Capability tags
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Tools this agent may request via inline tool markers
    #[serde(default)]
    pub allowed_tools: Vec<String>,

    /// Synthesis-only agents are never assigned speaking turns
    #[serde(default)]
    pub synthesis_only: bool,

    /// Generation parameters for this agent's completion calls
    #[serde(default)]
    pub generation: GenerationParams,
}

/// Role of a recorded conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of conversation supplied by the caller, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Inbound request for one deliberation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationRequest {
    /// Opaque, pre-authenticated caller identity
    pub user_id: String,

    /// The message the agents deliberate over
    pub message: String,

    /// Optional squad scope for memories and records
    #[serde(default)]
    pub squad_id: Option<String>,

    /// Optional context id recorded on the session
    #[serde(default)]
    pub context_id: Option<String>,

    /// Full agent roster for this turn, including any synthesis-only agent
    pub roster: Vec<AgentDescriptor>,

    /// Recent conversation history, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,

    /// Free-text project context injected into agent prompts
    #[serde(default)]
    pub project_context: Option<String>,

    /// Output size requested from each agent
    #[serde(default)]
    pub response_mode: ResponseMode,

    /// Deliberation phase for this turn
    #[serde(default)]
    pub phase: Phase,
}
