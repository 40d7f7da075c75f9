//! Error types and handling
//!
//! This module provides the error types used throughout the Conclave engine.
//! All errors implement the `ConclaveErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Error messages are safe to display to end users: no API keys, no internal
//! paths, no raw provider payloads.

use thiserror::Error;

/// Trait for Conclave error extensions
///
/// Provides additional context for errors: a user-facing hint and whether the
/// error is worth retrying. All engine errors implement this trait.
pub trait ConclaveErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around by the caller.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// Only a small set of failures is ever surfaced to callers: the deliberation
/// core degrades gracefully on provider and persistence failures, so the
/// variants here cover configuration, storage setup, and the one hard
/// precondition — a roster with at least one assignable agent.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Completion provider errors that block an entire turn
    #[error("Completion provider error: {0}")]
    CompletionProvider(String),

    #[error("Unknown completion provider: {0}")]
    UnknownProvider(String),

    // Deliberation preconditions
    #[error("Roster contains no assignable agents")]
    EmptyRoster,

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConclaveErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Database operation failed. Check the data directory",
            Self::CompletionProvider(_) => {
                "Completion provider unavailable. Check your API keys and network"
            }
            Self::UnknownProvider(_) => "Configure a supported completion provider",
            Self::EmptyRoster => "Add at least one non-synthesis agent to the roster",
            Self::InvalidRoster(_) => "Check the roster file for missing fields",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Fixing these requires operator intervention, not a retry
            Self::UnknownProvider(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
