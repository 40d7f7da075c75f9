// Conclave Deliberation Engine
// Main entry point for the conclave binary

use clap::Parser;
use conclave_engine::cli::{Cli, Command};
use conclave_engine::config::Config;
use conclave_engine::handlers::{
    handle_actions, handle_doctor, handle_history, handle_run, OutputFormat,
};
use conclave_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Conclave Engine v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    // Handle commands
    match cli.command {
        Command::Run {
            message,
            roster,
            user,
            squad,
            phase,
            mode,
            context,
        } => {
            tracing::info!("Running deliberation turn");
            handle_run(
                message, &roster, user, squad, &phase, &mode, context, &config, format,
            )
            .await
        }

        Command::History { limit, user } => {
            tracing::info!("Showing last {} sessions", limit);
            handle_history(limit, &user, &config, format).await
        }

        Command::Actions { limit, user } => {
            tracing::info!("Showing last {} pending actions", limit);
            handle_actions(limit, &user, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
