//! Completion Service Abstraction Layer
//!
//! This module provides a common interface for the text-completion backends
//! the orchestrator runs against (Anthropic, OpenAI-compatible). The
//! `CompletionService` trait treats the backend as a black box: a prompt goes
//! in, text and optionally structured tool calls come out. Provider failures
//! are classified so the orchestrator can distinguish rate limiting from
//! quota exhaustion from everything else.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod anthropic;
pub mod openai;

/// Result type for completion operations
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Errors that can occur during completion calls
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Quota exhausted")]
    QuotaExhausted,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl CompletionError {
    /// Classify a non-success HTTP status into the error taxonomy.
    ///
    /// 429 responses mentioning exhausted credit are quota errors, not rate
    /// limits: retrying them is pointless.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            402 => Self::QuotaExhausted,
            429 if body.contains("insufficient_quota") || body.contains("credit") => {
                Self::QuotaExhausted
            }
            429 => Self::RateLimited,
            400 => Self::InvalidRequest(body),
            _ => Self::Unknown(body),
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,

    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One completion request: prompt plus generation parameters
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Conversation including system prompt and user messages
    pub messages: Vec<Message>,

    /// Hard cap on output tokens
    pub max_tokens: u32,

    /// Sampling temperature (0.0-1.0)
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, max_tokens: u32, temperature: f64) -> Self {
        Self {
            messages,
            max_tokens,
            temperature: temperature.clamp(0.0, 1.0),
        }
    }
}

/// Structured tool call returned by a provider alongside the text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToolCall {
    /// Provider-assigned identifier for this call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments as a JSON string
    pub arguments: String,
}

/// Response from a completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub text: String,

    /// Structured tool calls, if the provider emitted any
    #[serde(default)]
    pub tool_calls: Vec<RawToolCall>,
}

impl Completion {
    /// Create a text-only completion
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

/// Completion service trait that all providers must implement
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the name of the provider (e.g., "anthropic", "openai")
    fn name(&self) -> &str;

    /// Generate a completion for the given request
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Check if the provider is currently configured and available.
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let assistant_msg = Message::assistant("Hi there");
        assert_eq!(assistant_msg.role, MessageRole::Assistant);

        let system_msg = Message::system("You are a deliberating agent");
        assert_eq!(system_msg.role, MessageRole::System);
    }

    #[test]
    fn test_request_clamps_temperature() {
        let request = CompletionRequest::new(vec![Message::user("hi")], 100, 3.5);
        assert!((request.temperature - 1.0).abs() < f64::EPSILON);

        let request = CompletionRequest::new(vec![Message::user("hi")], 100, -0.5);
        assert!(request.temperature.abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            CompletionError::from_status(429, "slow down".to_string()),
            CompletionError::RateLimited
        ));
        assert!(matches!(
            CompletionError::from_status(429, r#"{"error":{"type":"insufficient_quota"}}"#.into()),
            CompletionError::QuotaExhausted
        ));
        assert!(matches!(
            CompletionError::from_status(402, String::new()),
            CompletionError::QuotaExhausted
        ));
        assert!(matches!(
            CompletionError::from_status(401, "bad key".to_string()),
            CompletionError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            CompletionError::from_status(500, "boom".to_string()),
            CompletionError::Unknown(_)
        ));
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
    }
}
