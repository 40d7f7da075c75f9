//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Execute one deliberation turn
//! - history: Show recent sessions
//! - actions: Show recent pending actions
//! - doctor: Validate configuration and check provider availability

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::llm::{anthropic::AnthropicProvider, openai::OpenAIProvider, CompletionService};
use crate::orchestrator::Orchestrator;
use sdk::errors::EngineError;
use sdk::types::{AgentDescriptor, DeliberationRequest, Phase, ResponseMode};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Roster file shape: a list of [[agents]] tables
#[derive(Debug, Deserialize)]
struct RosterFile {
    agents: Vec<AgentDescriptor>,
}

/// Build the configured completion provider
pub fn build_provider(config: &Config) -> Result<Arc<dyn CompletionService>, EngineError> {
    match config.llm.default_provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicProvider::from_env(
            config.llm.anthropic.clone(),
        ))),
        "openai" => Ok(Arc::new(OpenAIProvider::from_env(
            config.llm.openai.clone(),
        ))),
        other => Err(EngineError::UnknownProvider(other.to_string())),
    }
}

/// Load a roster from a TOML file
fn load_roster(path: &Path) -> Result<Vec<AgentDescriptor>, EngineError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| EngineError::InvalidRoster(format!("cannot read {}: {}", path.display(), e)))?;

    let roster: RosterFile = toml::from_str(&contents)
        .map_err(|e| EngineError::InvalidRoster(format!("cannot parse roster: {}", e)))?;

    if roster.agents.is_empty() {
        return Err(EngineError::EmptyRoster);
    }

    Ok(roster.agents)
}

/// Run one deliberation turn
#[allow(clippy::too_many_arguments)]
pub async fn handle_run(
    message: String,
    roster_path: &Path,
    user: String,
    squad: Option<String>,
    phase: &str,
    mode: &str,
    project_context: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let roster = load_roster(roster_path)?;

    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;

    let provider = build_provider(config)?;
    let orchestrator = Orchestrator::new(provider, &database, &config.orchestrator);

    let request = DeliberationRequest {
        user_id: user,
        message,
        squad_id: squad,
        context_id: None,
        roster,
        history: Vec::new(),
        project_context,
        response_mode: ResponseMode::parse_or_default(mode),
        phase: Phase::parse_or_default(phase),
    };

    let result = orchestrator.deliberate(&request).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("Plan ({}):", result.plan.complexity.as_str());
            for goal in &result.plan.goals {
                println!("  goal: {}", goal);
            }
            for assignment in &result.plan.assignments {
                println!(
                    "  {}. {} — {}",
                    assignment.priority, assignment.agent_key, assignment.task
                );
            }

            if result.responses.is_empty() {
                println!("\nNo agent produced a response.");
            }
            for response in &result.responses {
                println!("\n=== {} ===", response.agent_name);
                if !response.stance.is_empty() {
                    println!("Stance: {} (confidence {:.2})", response.stance, response.confidence);
                }
                if !response.content.is_empty() {
                    println!("{}", response.content);
                }
                for call in &response.tool_calls {
                    println!("  -> requests tool: {}", call.tool);
                }
            }

            if let Some(synthesis) = &result.synthesis {
                println!("\n--- Synthesis ---\n{}", synthesis);
            }

            if let Some(session_id) = &result.session_id {
                println!("\nSession: {}", session_id);
            }
            if !result.memories_written.is_empty() {
                println!("Memories written: {}", result.memories_written.len());
            }
        }
    }

    database.close().await.ok();
    Ok(())
}

/// Show recent deliberation sessions
pub async fn handle_history(
    limit: usize,
    user: &str,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;

    let sessions = database.sessions().list_recent(user, limit as i64).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("No sessions recorded for {}.", user);
            }
            for session in &sessions {
                println!(
                    "{}  round {}  phase {}  agents [{}]",
                    session.id,
                    session.round,
                    session.phase,
                    session.agent_keys.join(", ")
                );
            }
        }
    }

    database.close().await.ok();
    Ok(())
}

/// Show recent pending actions
pub async fn handle_actions(
    limit: usize,
    user: &str,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;

    let actions = database.actions().list_recent(user, limit as i64).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
        OutputFormat::Text => {
            if actions.is_empty() {
                println!("No pending actions for {}.", user);
            }
            for action in &actions {
                println!(
                    "{}  [{}] {} ({})",
                    action.id,
                    action.status.as_str(),
                    action.label,
                    action.action_type
                );
            }
        }
    }

    database.close().await.ok();
    Ok(())
}

/// Validate configuration and check dependencies
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let db_ok = Database::new(&config.db_path()).await.is_ok();

    let provider = build_provider(config);
    let (provider_name, provider_ok) = match &provider {
        Ok(p) => (p.name().to_string(), p.check_health().await),
        Err(e) => (format!("unconfigured ({})", e), false),
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": db_ok,
                    "provider": provider_name,
                    "provider_available": provider_ok,
                    "data_dir": config.core.data_dir,
                })
            );
        }
        OutputFormat::Text => {
            println!("Conclave diagnostics:");
            println!("  Data dir:  {}", config.core.data_dir.display());
            println!("  Database:  {}", if db_ok { "ok" } else { "FAILED" });
            println!(
                "  Provider:  {} ({})",
                provider_name,
                if provider_ok {
                    "available"
                } else {
                    "unavailable — check the API key environment variable"
                }
            );
        }
    }

    Ok(())
}
