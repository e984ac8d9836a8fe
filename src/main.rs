//! Janus CLI entry point.

use clap::Parser;
use tracing::{debug, warn};

use janus::cli::commands;
use janus::cli::{Cli, Commands};
use janus::domain::models::Config;
use janus::infrastructure::logging::{prune_expired_logs, LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let loaded = janus::cli::load_config(cli.config.as_deref());

    let log_config = loaded
        .as_ref()
        .map(|config| LogConfig::from(&config.logging))
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Failed to initialize logging: {err:#}");
            None
        }
    };
    if let Some(dir) = &log_config.log_dir {
        match prune_expired_logs(dir, log_config.retention_days).await {
            Ok(removed) => debug!(removed, "Pruned expired log files"),
            Err(err) => warn!(error = %err, "Failed to prune expired log files"),
        }
    }

    let result = match cli.command {
        Commands::Config(args) => commands::config::execute(args, loaded, cli.json).await,
        command => match loaded {
            Ok(config) => dispatch(command, config, cli.json).await,
            Err(err) => Err(err),
        },
    };

    if let Err(err) = result {
        janus::cli::handle_error(err, cli.json);
    }
}

async fn dispatch(command: Commands, config: Config, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Answer(args) => commands::answer::execute(args, config, json).await,
        Commands::Features(args) => commands::features::execute(args, config, json).await,
        Commands::Decide(args) => commands::decide::execute(args, config, json).await,
        Commands::Eval(args) => commands::eval::execute(args, config, json).await,
        Commands::Records(args) => commands::records::execute(args, config, json).await,
        Commands::Config(args) => commands::config::execute(args, Ok(config), json).await,
    }
}
