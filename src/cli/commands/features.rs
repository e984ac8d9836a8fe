//! Implementation of the `janus features` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::QueryArgs;
use crate::cli::output::{output, table_with_header, CommandOutput};
use crate::domain::models::{Config, FeatureVector};
use crate::services::feature_extractor::FeatureExtractor;

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}

#[derive(Debug, Serialize)]
pub struct FeaturesOutput {
    pub query: String,
    pub features: FeatureVector,
}

impl CommandOutput for FeaturesOutput {
    fn to_human(&self) -> String {
        let f = &self.features;
        let mut table = table_with_header(&["Signal", "Value"]);
        let rows: [(&str, String); 13] = [
            ("language", f.language.to_string()),
            ("entity_count", f.entity_count.to_string()),
            ("has_time_expression", f.has_time_expression.to_string()),
            ("ambiguity", format!("{:.3}", f.ambiguity)),
            ("breaking_news", format!("{:.3}", f.breaking_news)),
            ("freshness_need", format!("{:.3}", f.freshness_need)),
            ("internal_confidence", format!("{:.3}", f.internal_confidence)),
            ("needs_computation", f.needs_computation.to_string()),
            ("volatility", format!("{:?}", f.volatility).to_lowercase()),
            ("staleness_horizon_days", format!("{:.1}", f.staleness_horizon_days)),
            (
                "max_staleness_days",
                f.max_staleness_days
                    .map_or_else(|| "-".to_string(), |days| days.to_string()),
            ),
            ("risk", format!("{:.1}", f.risk)),
            ("degraded", f.degraded.to_string()),
        ];
        for (name, value) in rows {
            table.add_row(vec![name.to_string(), value]);
        }
        format!("Features for: {}\n{table}", self.query)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: FeaturesArgs, config: Config, json_mode: bool) -> Result<()> {
    let extractor = FeatureExtractor::new(config.features);
    let query = args.query.into_request().into_query();
    let features = extractor.extract(&query);

    output(
        &FeaturesOutput {
            query: query.text().to_string(),
            features,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Query;

    #[test]
    fn test_human_output_lists_signals() {
        let query = Query::new("What is 12 * 7?");
        let output = FeaturesOutput {
            query: query.text().to_string(),
            features: FeatureExtractor::default().extract(&query),
        };
        let human = output.to_human();
        assert!(human.contains("needs_computation"));
        assert!(human.contains("staleness_horizon_days"));
        assert_eq!(output.to_json()["features"]["needs_computation"], true);
    }
}
