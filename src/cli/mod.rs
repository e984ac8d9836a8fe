//! Command-line interface for the Janus answering loop.
//!
//! Every command prints human-readable output by default and a single JSON
//! document with `--json`. Logs never share stdout with command output.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "janus")]
#[command(about = "Janus - budget-aware gating and orchestration for grounded answers", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file to load instead of .janus/config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question through the full gating loop
    Answer(commands::answer::AnswerArgs),

    /// Show the feature vector extracted from a question
    Features(commands::features::FeaturesArgs),

    /// Show the ranked gating decision for a question without executing it
    Decide(commands::decide::DecideArgs),

    /// Evaluate the gating policy against a labelled JSONL dataset
    Eval(commands::eval::EvalArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Inspect recorded resolutions
    Records(commands::records::RecordsArgs),
}

/// Load configuration from `path`, or from the project hierarchy.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print an error with its cause chain and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {}", console::style("Error:").red().bold(), err);
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_answer_with_overrides() {
        let cli = Cli::try_parse_from([
            "janus",
            "--json",
            "answer",
            "What changed today?",
            "--language",
            "es",
            "--max-staleness-days",
            "2",
            "--tokens",
            "900",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Answer(args) = cli.command else {
            panic!("expected answer command");
        };
        assert_eq!(args.query.text, "What changed today?");
        assert_eq!(args.tokens, Some(900));
        assert_eq!(args.query.max_staleness_days, Some(2));
    }

    #[test]
    fn test_parse_rejects_unknown_language() {
        assert!(Cli::try_parse_from(["janus", "features", "hola", "--language", "xx"]).is_err());
    }

    #[test]
    fn test_parse_config_subcommands() {
        let cli = Cli::try_parse_from(["janus", "config", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Config(_)));

        let cli = Cli::try_parse_from(["janus", "-c", "alt.yaml", "records", "list", "-n", "5"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("alt.yaml")));
    }
}
