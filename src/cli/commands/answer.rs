//! Implementation of the `janus answer` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use serde::Serialize;
use uuid::Uuid;

use super::QueryArgs;
use crate::cli::output::{output, styled_outcome, table_with_header, truncate, CommandOutput};
use crate::domain::models::{
    AttemptOutcome, Citation, Config, Cost, FinalAnswer, Resolution, TraceEntry,
};
use crate::infrastructure::setup::build_answer_service;

#[derive(Args, Debug)]
pub struct AnswerArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Latency budget in milliseconds (defaults to budget.latency_ms)
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Token budget (defaults to budget.tokens)
    #[arg(long)]
    pub tokens: Option<u64>,

    /// Absolute deadline (RFC 3339); the configured deadline still applies
    #[arg(long)]
    pub deadline: Option<DateTime<Utc>>,

    /// Show the execution trace
    #[arg(long)]
    pub trace: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerOutput {
    pub query_id: Uuid,
    pub outcome: &'static str,
    pub action: Option<String>,
    pub reason: Option<String>,
    pub text: String,
    pub citations: Vec<Citation>,
    pub model_version: String,
    pub consumed: Cost,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

impl AnswerOutput {
    fn from_resolution(resolution: &Resolution, with_trace: bool) -> Self {
        let answer = &resolution.final_answer;
        let citations = match answer {
            FinalAnswer::Accepted { answer, .. } => answer.citations.clone(),
            _ => Vec::new(),
        };
        Self {
            query_id: resolution.query.id(),
            outcome: answer.outcome(),
            action: answer.accepted_action().map(|action| action.to_string()),
            reason: answer.escalation_reason().map(|reason| reason.to_string()),
            text: answer.display_text().to_string(),
            citations,
            model_version: resolution.decision.model_version().to_string(),
            consumed: resolution.consumed,
            trace: with_trace.then(|| resolution.trace.entries().to_vec()),
        }
    }
}

fn outcome_detail(outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::ExecutorFailed { detail }
        | AttemptOutcome::VerificationUnavailable { detail } => detail.clone(),
        AttemptOutcome::Aborted { interruption }
        | AttemptOutcome::VerificationSkipped { interruption } => interruption.to_string(),
        AttemptOutcome::Escalated { reason } => reason.to_string(),
        _ => String::new(),
    }
}

impl CommandOutput for AnswerOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.text.clone(), String::new()];

        let mut summary = format!("{}", styled_outcome(self.outcome));
        if let Some(action) = &self.action {
            summary.push_str(&format!(" via {action}"));
        }
        if let Some(reason) = &self.reason {
            summary.push_str(&format!(" ({reason})"));
        }
        lines.push(summary);
        lines.push(format!(
            "{} {}  {} {}",
            style("consumed:").dim(),
            self.consumed,
            style("model:").dim(),
            self.model_version
        ));

        if !self.citations.is_empty() {
            lines.push("\nCitations:".to_string());
            for citation in &self.citations {
                lines.push(format!(
                    "  [{}] {} ({:.2})",
                    citation.source_id,
                    truncate(&citation.span, 60),
                    citation.confidence
                ));
            }
        }

        if let Some(trace) = &self.trace {
            let mut table = table_with_header(&["#", "Action", "Outcome", "Cost", "Truth", "Detail"]);
            for entry in trace {
                table.add_row(vec![
                    entry.sequence.to_string(),
                    entry.action.to_string(),
                    entry.outcome.label().to_string(),
                    entry.cost.to_string(),
                    entry
                        .verification
                        .as_ref()
                        .map_or_else(|| "-".to_string(), |v| format!("{:.2}", v.truthfulness)),
                    truncate(&outcome_detail(&entry.outcome), 40),
                ]);
            }
            lines.push(format!("\nTrace:\n{table}"));
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AnswerArgs, config: Config, json_mode: bool) -> Result<()> {
    let (service, db) = build_answer_service(&config)
        .await
        .context("Failed to build answering service")?;

    let mut request = args.query.into_request();
    request.latency_ms = args.latency_ms;
    request.tokens = args.tokens;
    request.deadline = args.deadline;

    let resolution = service
        .resolve(request)
        .await
        .context("Resolution failed")?;

    output(&AnswerOutput::from_resolution(&resolution, args.trace), json_mode);

    if let Some(db) = db {
        db.close().await;
    }
    Ok(())
}
