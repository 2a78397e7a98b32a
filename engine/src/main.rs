// RepoJudge evaluation engine
// Main entry point for the repojudge binary

use clap::Parser;
use repojudge_engine::cli::{Cli, Command, ConfigAction};
use repojudge_engine::config::Config;
use repojudge_engine::handlers::{
    handle_config_path, handle_config_show, handle_evaluate, handle_plan, handle_score,
    OutputFormat,
};
use repojudge_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Priority: RUST_LOG > --log > config log level
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::debug!("RepoJudge v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Evaluate { input } => {
            tracing::info!("Evaluating {}", input.request.display());
            handle_evaluate(&input, &config, format).await
        }

        Command::Plan { input } => handle_plan(&input, &config, format),

        Command::Score { input, top } => handle_score(&input, top, &config, format),

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(cli.config.as_deref(), format),
        },
    }
}
