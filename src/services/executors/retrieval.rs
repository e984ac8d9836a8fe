//! Retrieval-augmented generation.
//!
//! Searches the index, drops passages older than the caller's freshness
//! requirement, then generates an answer that cites the surviving passages
//! with `[n]` markers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use super::parametric::generate_within;
use super::{aborted, StrategyExecutor};
use crate::domain::errors::{CollaboratorError, ExecutorFailure, ExecutorFailureCause};
use crate::domain::models::{
    ActionKind, CandidateAnswer, Citation, Config, Cost, EvidencePassage, FeatureVector, Query,
};
use crate::domain::ports::{GenerationConstraints, LanguageModel, RetrievalIndex};
use crate::services::budget_controller::ExecutionBudget;

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{1,3})\]").expect("valid regex"));

#[derive(Clone)]
pub struct RetrievalExecutor {
    index: Arc<dyn RetrievalIndex>,
    lm: Arc<dyn LanguageModel>,
    search_cost: Cost,
    generation_cost: Cost,
    top_k: usize,
    temperature: f64,
}

impl RetrievalExecutor {
    pub fn new(index: Arc<dyn RetrievalIndex>, lm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self {
            index,
            lm,
            search_cost: config.costs.search.cost(),
            generation_cost: config.costs.generation.cost(),
            top_k: config.retrieval.top_k,
            temperature: config.generation.temperature,
        }
    }
}

/// Keep passages no older than `max_staleness_days`.
///
/// Without a requirement every passage is kept. With one, passages lacking a
/// publication date are dropped since their age cannot be shown to comply.
pub fn fresh_passages(
    passages: Vec<EvidencePassage>,
    max_staleness_days: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<EvidencePassage> {
    let Some(days) = max_staleness_days else {
        return passages;
    };
    let horizon = chrono::Duration::days(i64::from(days));
    passages
        .into_iter()
        .filter(|p| p.published_at.is_some_and(|published| now - published <= horizon))
        .collect()
}

/// Passage counts by age: up to 7 days, up to 30 days, older.
pub fn age_histogram(passages: &[EvidencePassage], now: DateTime<Utc>) -> [u32; 3] {
    let mut bins = [0u32; 3];
    for published in passages.iter().filter_map(|p| p.published_at) {
        let age = (now - published).num_days();
        let bin = if age <= 7 {
            0
        } else if age <= 30 {
            1
        } else {
            2
        };
        bins[bin] += 1;
    }
    bins
}

fn prompt(query: &Query, features: &FeatureVector, passages: &[EvidencePassage]) -> String {
    let mut prompt = format!(
        "Answer the question using only the numbered passages. Cite every claim with its \
         passage number in square brackets, e.g. [1]. Reply in language '{}'.\n\n",
        features.language
    );
    for (n, passage) in passages.iter().enumerate() {
        let _ = writeln!(prompt, "[{}] ({}) {}", n + 1, passage.document_id, passage.span);
    }
    let _ = write!(prompt, "\nQuestion: {}\nAnswer:", query.text());
    prompt
}

/// Citations for the passages the answer refers to, or all of them when it
/// carries no usable marker.
fn cite(text: &str, passages: &[EvidencePassage]) -> Vec<Citation> {
    let referenced: BTreeSet<usize> = CITATION_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .filter(|n| (1..=passages.len()).contains(n))
        .collect();
    if referenced.is_empty() {
        passages.iter().map(Citation::from).collect()
    } else {
        referenced
            .into_iter()
            .map(|n| Citation::from(&passages[n - 1]))
            .collect()
    }
}

#[async_trait]
impl StrategyExecutor for RetrievalExecutor {
    fn action(&self) -> ActionKind {
        ActionKind::Retrieve
    }

    async fn execute(
        &self,
        query: &Query,
        features: &FeatureVector,
        budget: &ExecutionBudget,
    ) -> Result<CandidateAnswer, ExecutorFailure> {
        let action = self.action();
        if let Err(interruption) = budget.checkpoint(&self.search_cost) {
            return Ok(aborted(action, interruption, budget));
        }

        let passages = self
            .index
            .search(query.text(), features.language, self.top_k)
            .await
            .map_err(|err| ExecutorFailure::new(action, err))?;
        if passages.iter().any(|p| !p.score.is_finite()) {
            return Err(ExecutorFailure::new(
                action,
                CollaboratorError::Malformed("non-finite passage score".to_string()),
            ));
        }

        let now = Utc::now();
        let found = passages.len();
        let evidence = fresh_passages(passages, features.max_staleness_days, now);
        tracing::debug!(
            query_id = %query.id(),
            found,
            fresh = evidence.len(),
            age_histogram = ?age_histogram(&evidence, now),
            "Retrieved evidence"
        );
        if evidence.is_empty() {
            return Err(ExecutorFailure::new(
                action,
                ExecutorFailureCause::NoEvidence(format!(
                    "{found} passages found, none within the freshness requirement"
                )),
            ));
        }

        if let Err(interruption) = budget.checkpoint(&self.generation_cost) {
            return Ok(aborted(action, interruption, budget));
        }

        let constraints = GenerationConstraints {
            max_tokens: self.generation_cost.tokens,
            temperature: self.temperature,
            language: features.language,
        };
        let generation = generate_within(
            self.lm.as_ref(),
            &prompt(query, features, &evidence),
            &constraints,
        )
        .await
        .map_err(|err| ExecutorFailure::new(action, err))?;

        let text = generation.text.trim().to_string();
        let citations = cite(&text, &evidence);
        Ok(CandidateAnswer::text(action, text, budget.committed())
            .with_citations(citations, evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, age_days: Option<i64>, now: DateTime<Utc>) -> EvidencePassage {
        EvidencePassage {
            document_id: id.to_string(),
            span: format!("span of {id}"),
            score: 0.7,
            published_at: age_days.map(|d| now - chrono::Duration::days(d)),
        }
    }

    #[test]
    fn test_fresh_passages_respects_requirement() {
        let now = Utc::now();
        let passages = vec![
            passage("new", Some(2), now),
            passage("old", Some(40), now),
            passage("undated", None, now),
        ];

        let all = fresh_passages(passages.clone(), None, now);
        assert_eq!(all.len(), 3);

        let fresh = fresh_passages(passages, Some(7), now);
        let ids: Vec<_> = fresh.iter().map(|p| p.document_id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_age_histogram() {
        let now = Utc::now();
        let passages = vec![
            passage("a", Some(1), now),
            passage("b", Some(10), now),
            passage("c", Some(100), now),
            passage("d", Some(200), now),
            passage("e", None, now),
        ];
        assert_eq!(age_histogram(&passages, now), [1, 1, 2]);
    }

    #[test]
    fn test_cite_uses_markers() {
        let now = Utc::now();
        let passages = vec![passage("a", None, now), passage("b", None, now)];

        let citations = cite("Paris is the capital [2]. See also [9].", &passages);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].source_id, "b");

        let citations = cite("No markers here.", &passages);
        assert_eq!(citations.len(), 2);
    }
}
