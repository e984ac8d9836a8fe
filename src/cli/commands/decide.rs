//! Implementation of the `janus decide` command.
//!
//! Runs feature extraction and the gating policy against a full default
//! budget, so the ranking can be inspected without calling any collaborator.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::QueryArgs;
use crate::application::budget_for;
use crate::cli::output::{output, table_with_header, CommandOutput};
use crate::domain::models::{Config, FeatureVector, GatingDecision};
use crate::infrastructure::setup::build_policy;

#[derive(Args, Debug)]
pub struct DecideArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Latency budget in milliseconds (defaults to budget.latency_ms)
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Token budget (defaults to budget.tokens)
    #[arg(long)]
    pub tokens: Option<u64>,

    /// Include the feature vector in the output
    #[arg(long)]
    pub features: bool,
}

#[derive(Debug, Serialize)]
pub struct DecideOutput {
    pub query: String,
    pub decision: GatingDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

impl CommandOutput for DecideOutput {
    fn to_human(&self) -> String {
        let mut table = table_with_header(&["Rank", "Action", "Confidence", "Rationale"]);
        for (rank, entry) in self.decision.entries().iter().enumerate() {
            table.add_row(vec![
                (rank + 1).to_string(),
                entry.action.to_string(),
                format!("{:.3}", entry.confidence),
                format!("{:?}", entry.rationale),
            ]);
        }
        let mut lines = vec![
            format!("Decision for: {}", self.query),
            format!("Model: {}", self.decision.model_version()),
            table.to_string(),
        ];
        if let Some(features) = &self.features {
            lines.push(serde_json::to_string_pretty(features).unwrap_or_default());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: DecideArgs, config: Config, json_mode: bool) -> Result<()> {
    let (extractor, policy) = build_policy(&config)?;
    let query = args.query.into_request().into_query();
    let budget = budget_for(&query, &config.budget, args.latency_ms, args.tokens);

    let features = extractor.extract(&query);
    let decision = policy.decide(&features, &budget.snapshot());

    output(
        &DecideOutput {
            query: query.text().to_string(),
            decision,
            features: args.features.then_some(features),
        },
        json_mode,
    );
    Ok(())
}
