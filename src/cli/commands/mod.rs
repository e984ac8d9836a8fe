//! CLI command implementations.

pub mod answer;
pub mod config;
pub mod decide;
pub mod eval;
pub mod features;
pub mod records;

use clap::Args;

use crate::application::AnswerRequest;
use crate::domain::models::{Language, QueryDomain, QueryMetadata, RiskLevel, Volatility};

/// A question and the optional metadata that sharpens its signals.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Question text
    #[arg(value_name = "QUERY")]
    pub text: String,

    /// Declared language (en, es, hi, ur, ar, zh, ja); detected when omitted
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Maximum acceptable age of supporting evidence, in days
    #[arg(long)]
    pub max_staleness_days: Option<u32>,

    /// Risk level (low, med, high)
    #[arg(long)]
    pub risk: Option<RiskLevel>,

    /// Subject domain (general, medical, finance, science, other)
    #[arg(long)]
    pub domain: Option<QueryDomain>,

    /// Volatility of the subject (timeless, slow, fast, breaking)
    #[arg(long)]
    pub volatility: Option<Volatility>,
}

impl QueryArgs {
    pub fn into_request(self) -> AnswerRequest {
        AnswerRequest {
            language: self.language,
            max_staleness_days: self.max_staleness_days,
            metadata: QueryMetadata {
                risk: self.risk.unwrap_or_default(),
                domain: self.domain.unwrap_or_default(),
                volatility: self.volatility,
            },
            ..AnswerRequest::new(self.text)
        }
    }
}
