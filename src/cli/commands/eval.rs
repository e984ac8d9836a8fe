//! Implementation of the `janus eval` command.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

use crate::cli::output::{output, percent, table_with_header, CommandOutput};
use crate::domain::models::{ActionKind, Config};
use crate::infrastructure::setup::build_policy;
use crate::services::budget_controller::BudgetController;
use crate::services::evaluation::{evaluate_policy, parse_dataset, EvaluationReport};

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Labelled JSONL dataset
    pub dataset: PathBuf,

    /// Latency budget in milliseconds each example is gated against
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Token budget each example is gated against
    #[arg(long)]
    pub tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
    pub dataset: PathBuf,
    #[serde(flatten)]
    pub report: EvaluationReport,
}

impl EvalOutput {
    fn confusion_table(&self) -> String {
        let mut header = vec!["labelled \\ predicted"];
        header.extend(ActionKind::ALL.iter().map(|action| action.as_str()));
        let mut table = table_with_header(&header);
        for labelled in ActionKind::ALL {
            let mut row = vec![labelled.to_string()];
            row.extend(
                ActionKind::ALL
                    .iter()
                    .map(|&predicted| self.report.confusion.count(labelled, predicted).to_string()),
            );
            table.add_row(row);
        }
        table.to_string()
    }

    fn metrics_table(&self) -> String {
        let report = &self.report;
        let mut table = table_with_header(&["Metric", "Value"]);
        table.add_row(vec!["accuracy".to_string(), percent(report.accuracy)]);
        table.add_row(vec![
            "retrieve-when-needed recall".to_string(),
            percent(report.retrieve_when_needed_recall),
        ]);
        table.add_row(vec![
            "parametric-when-safe precision".to_string(),
            percent(report.parametric_when_safe_precision),
        ]);
        table.add_row(vec![
            "freshness SLA hit rate".to_string(),
            percent(report.freshness_sla_hit_rate),
        ]);
        if let Some(latency) = report.latency {
            table.add_row(vec![
                "latency p50 / p95".to_string(),
                format!("{:.0} ms / {:.0} ms", latency.p50, latency.p95),
            ]);
        }
        if let Some(cost) = report.cost_per_supported {
            table.add_row(vec!["cost per supported answer".to_string(), format!("{cost:.1} tok")]);
        }
        table.add_row(vec![
            "pareto frontier points".to_string(),
            report.pareto_frontier.len().to_string(),
        ]);
        table.to_string()
    }

    fn language_table(&self) -> String {
        let mut table = table_with_header(&["Language", "Examples", "Agreement", "Gap vs en"]);
        for (language, stats) in &self.report.per_language {
            let gap = self
                .report
                .cross_lingual_gap
                .get(language)
                .map_or_else(|| "-".to_string(), |gap| format!("{:+.1} pts", gap * 100.0));
            table.add_row(vec![
                language.to_string(),
                stats.examples.to_string(),
                percent(Some(stats.agreement)),
                gap,
            ]);
        }
        table.to_string()
    }
}

impl CommandOutput for EvalOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Evaluated {} example(s) from {} with model {}",
            self.report.examples,
            self.dataset.display(),
            self.report.model_version
        )];
        if self.report.examples == 0 {
            return lines.join("\n");
        }
        lines.push(format!("\nConfusion matrix:\n{}", self.confusion_table()));
        lines.push(format!("\nMetrics:\n{}", self.metrics_table()));
        lines.push(format!("\nPer language:\n{}", self.language_table()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: EvalArgs, config: Config, json_mode: bool) -> Result<()> {
    let file = File::open(&args.dataset)
        .with_context(|| format!("Failed to open dataset {}", args.dataset.display()))?;
    let examples = parse_dataset(BufReader::new(file))
        .with_context(|| format!("Failed to parse dataset {}", args.dataset.display()))?;

    let (extractor, policy) = build_policy(&config)?;
    let budget = BudgetController::new(
        args.latency_ms
            .map_or_else(|| config.budget.latency(), std::time::Duration::from_millis),
        args.tokens.unwrap_or(config.budget.tokens),
        Utc::now() + config.budget.deadline(),
    );

    let report = evaluate_policy(&extractor, &policy, &budget.snapshot(), &examples);
    info!(
        examples = report.examples,
        model_version = %report.model_version,
        accuracy = report.accuracy.unwrap_or_default(),
        "Policy evaluation complete"
    );

    output(
        &EvalOutput {
            dataset: args.dataset,
            report,
        },
        json_mode,
    );
    Ok(())
}
