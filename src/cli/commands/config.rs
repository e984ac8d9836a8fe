//! Implementation of the `janus config` commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::setup::{create_config_file, SetupPaths};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration after all layers are merged
    Show,

    /// Check that the configuration loads and validates
    Validate,

    /// Write the default configuration to .janus/config.yaml
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct ShowOutput {
    #[serde(flatten)]
    pub config: Config,
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub valid: bool,
    pub message: String,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub created: bool,
    pub message: String,
    pub config_file: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// `loaded` is the result of loading the configuration; `init` ignores it so
/// a broken file can be replaced.
pub async fn execute(args: ConfigArgs, loaded: Result<Config>, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            output(&ShowOutput { config: loaded? }, json_mode);
        }
        ConfigCommands::Validate => {
            loaded?;
            output(
                &ValidateOutput {
                    valid: true,
                    message: "Configuration is valid".to_string(),
                },
                json_mode,
            );
        }
        ConfigCommands::Init { force } => {
            let paths = SetupPaths::new()?;
            output(&init(&paths, force)?, json_mode);
        }
    }
    Ok(())
}

fn init(paths: &SetupPaths, force: bool) -> Result<InitOutput> {
    let created = create_config_file(paths, force)?;
    let message = if created {
        format!("Wrote default configuration to {}", paths.config_file.display())
    } else {
        format!(
            "{} already exists. Use --force to overwrite.",
            paths.config_file.display()
        )
    };
    Ok(InitOutput {
        created,
        message,
        config_file: paths.config_file.clone(),
    })
}
