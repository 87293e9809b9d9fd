//! Intraday trading engine CLI.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use intraday_config::load_config;
use intraday_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
        Commands::Live(args) => {
            let config = load_config(&cli.config)
                .with_context(|| format!("failed to load {}", cli.config.display()))?;

            let level = cli
                .log_level
                .map(|l| l.as_str())
                .unwrap_or(&config.logging.level);
            let json = cli.json_logs || config.logging.format == "json";
            let _guard = setup_logging(level, json, config.logging.file.as_deref());

            cli::commands::live::run(args, config).await
        }
    }
}
