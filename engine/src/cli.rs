//! CLI interface for Conclave
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for driving the deliberation
//! engine from a terminal.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Conclave Deliberation Engine
///
/// Runs a roster of AI agents against a message, in planned order, and
/// records their responses, proposed actions, and memories.
#[derive(Parser, Debug)]
#[command(name = "conclave")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one deliberation turn over a message
    Run {
        /// The message to deliberate over
        message: String,

        /// Path to a TOML roster file describing the agents
        #[arg(short, long, value_name = "PATH")]
        roster: PathBuf,

        /// Caller identity recorded on sessions and memories
        #[arg(long, default_value = "local")]
        user: String,

        /// Optional squad scope
        #[arg(long)]
        squad: Option<String>,

        /// Deliberation phase (proposal, critique, reconciliation)
        #[arg(long, default_value = "proposal")]
        phase: String,

        /// Response mode (short, structured, detailed)
        #[arg(long, default_value = "structured")]
        mode: String,

        /// Free-text project context injected into agent prompts
        #[arg(long)]
        context: Option<String>,
    },

    /// Show recent deliberation sessions
    History {
        /// Number of sessions to show (default: 10)
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Caller identity to list sessions for
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Show recent pending actions surfaced by agents
    Actions {
        /// Number of actions to show (default: 10)
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Caller identity to list actions for
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Run system diagnostics
    Doctor,
}
