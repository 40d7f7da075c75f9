//! Conclave Engine Library
//!
//! This library provides the core functionality of the Conclave deliberation
//! engine. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Completion service abstraction layer
pub mod llm;

/// Deliberation orchestration module
pub mod orchestrator;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
