//! Conclave SDK
//!
//! Shared library providing the deliberation contract types and error taxonomy
//! for Conclave components. This crate is used by the engine and by frontends
//! that submit deliberation requests and render agent responses.

/// Error types and handling
pub mod errors;

/// Deliberation contract types
pub mod types;

// Re-export commonly used types
pub use errors::{ConclaveErrorExt, EngineError};
pub use types::{
    AgentDescriptor, ConversationTurn, DeliberationRequest, GenerationParams, Phase, ResponseMode,
    TurnRole,
};
