//! Implementation of the `janus records` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, styled_outcome, table_with_header, truncate, CommandOutput};
use crate::domain::models::{Config, ResolutionRecord};
use crate::infrastructure::database::{DatabaseConnection, SqliteLabelStore};

#[derive(Args, Debug)]
pub struct RecordsArgs {
    #[command(subcommand)]
    pub command: RecordsCommands,
}

#[derive(Subcommand, Debug)]
pub enum RecordsCommands {
    /// List the most recent resolutions
    List {
        /// Maximum number of records to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: u32,
    },

    /// Count stored resolutions per outcome
    Stats,
}

#[derive(Debug, Serialize)]
pub struct RecordListOutput {
    pub records: Vec<ResolutionRecord>,
}

impl CommandOutput for RecordListOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No resolutions recorded.".to_string();
        }
        let mut table = table_with_header(&[
            "Recorded", "Query", "Lang", "Outcome", "Action", "Attempts", "Consumed",
        ]);
        for record in &self.records {
            let action = record
                .final_action
                .clone()
                .or_else(|| record.escalation_reason.clone())
                .unwrap_or_else(|| "-".to_string());
            table.add_row(vec![
                record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                truncate(&record.query_text, 40),
                record.language.to_string(),
                styled_outcome(&record.outcome).to_string(),
                action,
                record.attempts.to_string(),
                record.consumed.to_string(),
            ]);
        }
        format!("{table}\n\nShowing {} record(s)", self.records.len())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct RecordStatsOutput {
    pub outcomes: Vec<OutcomeCount>,
}

#[derive(Debug, Serialize)]
pub struct OutcomeCount {
    pub outcome: String,
    pub count: i64,
}

impl CommandOutput for RecordStatsOutput {
    fn to_human(&self) -> String {
        let mut table = table_with_header(&["Outcome", "Count"]);
        for entry in &self.outcomes {
            table.add_row(vec![
                styled_outcome(&entry.outcome).to_string(),
                entry.count.to_string(),
            ]);
        }
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: RecordsArgs, config: Config, json_mode: bool) -> Result<()> {
    let db = DatabaseConnection::open(&config.database.path, config.database.max_connections)
        .await
        .context("Failed to open label store database")?;
    db.migrate().await?;
    let store = SqliteLabelStore::new(db.pool().clone());

    match args.command {
        RecordsCommands::List { limit } => {
            let records = store
                .list_recent(limit)
                .await
                .context("Failed to list resolutions")?;
            output(&RecordListOutput { records }, json_mode);
        }
        RecordsCommands::Stats => {
            let outcomes = store
                .count_by_outcome()
                .await
                .context("Failed to count resolutions")?
                .into_iter()
                .map(|(outcome, count)| OutcomeCount { outcome, count })
                .collect();
            output(&RecordStatsOutput { outcomes }, json_mode);
        }
    }

    db.close().await;
    Ok(())
}
