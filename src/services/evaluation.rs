//! Offline evaluation of the gating policy.
//!
//! Reads a labelled JSONL dataset, runs feature extraction and gating on
//! every example against a full budget, and aggregates routing quality,
//! freshness and efficiency metrics.
//!
//! Each line is one [`LabelledExample`]:
//!
//! ```json
//! {"query": "Who won the election yesterday?", "label": "retrieve",
//!  "needs_retrieval": true, "safe_parametric": false, "max_staleness_days": 2,
//!  "latency_ms": 1830, "cost_tokens": 790, "supported": true, "truthfulness": 0.91}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ActionKind, BudgetSnapshot, FreshnessRequirement, Language, Query, QueryMetadata,
};
use crate::services::feature_extractor::FeatureExtractor;
use crate::services::gating_policy::GatingPolicy;

const fn default_true() -> bool {
    true
}

/// One labelled query, optionally with measurements from a live run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledExample {
    pub query: String,
    #[serde(default)]
    pub language: Option<Language>,
    /// Action a reviewer judged correct.
    pub label: ActionKind,
    #[serde(default)]
    pub needs_retrieval: bool,
    #[serde(default = "default_true")]
    pub safe_parametric: bool,
    #[serde(default)]
    pub max_staleness_days: Option<u32>,
    #[serde(default)]
    pub metadata: QueryMetadata,
    #[serde(default)]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub cost_tokens: Option<f64>,
    #[serde(default)]
    pub supported: Option<bool>,
    #[serde(default)]
    pub truthfulness: Option<f64>,
}

impl LabelledExample {
    pub fn to_query(&self) -> Query {
        let mut query = Query::new(self.query.clone()).with_metadata(self.metadata);
        if let Some(language) = self.language {
            query = query.with_language(language);
        }
        if let Some(days) = self.max_staleness_days {
            query = query.with_freshness(FreshnessRequirement::days(days));
        }
        query
    }
}

/// Parse a JSONL dataset. Blank lines and `#` comments are skipped.
pub fn parse_dataset(reader: impl BufRead) -> DomainResult<Vec<LabelledExample>> {
    let mut examples = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| DomainError::Storage(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let example = serde_json::from_str(line).map_err(|e| {
            DomainError::Serialization(format!("dataset line {}: {e}", index + 1))
        })?;
        examples.push(example);
    }
    Ok(examples)
}

/// Labelled action (rows) against predicted action (columns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[u32; 5]; 5],
}

impl ConfusionMatrix {
    pub fn record(&mut self, labelled: ActionKind, predicted: ActionKind) {
        self.counts[labelled.index()][predicted.index()] += 1;
    }

    pub fn count(&self, labelled: ActionKind, predicted: ActionKind) -> u32 {
        self.counts[labelled.index()][predicted.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u32 {
        (0..5).map(|i| self.counts[i][i]).sum()
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.correct(), self.total())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub truthfulness: f64,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub examples: u32,
    pub agreement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_version: String,
    pub examples: u32,
    pub confusion: ConfusionMatrix,
    pub accuracy: Option<f64>,
    /// Share of retrieval-needing queries routed to `Retrieve`.
    pub retrieve_when_needed_recall: Option<f64>,
    /// Share of `Parametric` routings that were labelled safe.
    pub parametric_when_safe_precision: Option<f64>,
    /// Share of freshness-constrained queries whose staleness horizon fits
    /// the requirement.
    pub freshness_sla_hit_rate: Option<f64>,
    pub per_language: BTreeMap<Language, LanguageStats>,
    /// Agreement difference of each language against English.
    pub cross_lingual_gap: BTreeMap<Language, f64>,
    pub latency: Option<LatencyPercentiles>,
    pub cost_per_supported: Option<f64>,
    pub pareto_frontier: Vec<ParetoPoint>,
}

fn ratio(numerator: u32, denominator: u32) -> Option<f64> {
    (denominator > 0).then(|| f64::from(numerator) / f64::from(denominator))
}

/// Retrieve-when-needed recall and parametric-when-safe precision.
pub fn gating_metrics(
    predictions: &[(ActionKind, &LabelledExample)],
) -> (Option<f64>, Option<f64>) {
    let (mut retrieved, mut needed) = (0, 0);
    let (mut safe, mut parametric) = (0, 0);
    for (predicted, example) in predictions {
        if example.needs_retrieval {
            needed += 1;
            if *predicted == ActionKind::Retrieve {
                retrieved += 1;
            }
        }
        if *predicted == ActionKind::Parametric {
            parametric += 1;
            if example.safe_parametric {
                safe += 1;
            }
        }
    }
    (ratio(retrieved, needed), ratio(safe, parametric))
}

/// Linear-interpolated percentile of `values`, `q` in `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Points not dominated on (higher truthfulness, lower latency).
pub fn pareto_frontier(points: &[ParetoPoint]) -> Vec<ParetoPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        b.truthfulness
            .total_cmp(&a.truthfulness)
            .then(a.latency_ms.total_cmp(&b.latency_ms))
    });
    let mut frontier: Vec<ParetoPoint> = Vec::new();
    for point in sorted {
        if frontier
            .last()
            .map_or(true, |best| point.latency_ms < best.latency_ms)
        {
            frontier.push(point);
        }
    }
    frontier
}

/// Total token cost over the number of supported answers.
pub fn cost_per_supported(examples: &[LabelledExample]) -> Option<f64> {
    let measured: Vec<_> = examples
        .iter()
        .filter_map(|e| e.cost_tokens.map(|cost| (cost, e.supported.unwrap_or(false))))
        .collect();
    let supported = measured.iter().filter(|(_, ok)| *ok).count();
    if supported == 0 {
        return None;
    }
    Some(measured.iter().map(|(cost, _)| cost).sum::<f64>() / supported as f64)
}

/// Route every example through `extractor` and `policy` and score the result.
pub fn evaluate_policy(
    extractor: &FeatureExtractor,
    policy: &GatingPolicy,
    budget: &BudgetSnapshot,
    examples: &[LabelledExample],
) -> EvaluationReport {
    let mut confusion = ConfusionMatrix::default();
    let mut predictions = Vec::with_capacity(examples.len());
    let mut per_language: BTreeMap<Language, (u32, u32)> = BTreeMap::new();
    let (mut sla_hits, mut sla_total) = (0, 0);

    for example in examples {
        let features = extractor.extract(&example.to_query());
        let decision = policy.decide(&features, budget);
        let predicted = decision
            .top()
            .map_or(ActionKind::Escalate, |ranked| ranked.action);

        confusion.record(example.label, predicted);
        predictions.push((predicted, example));

        let stats = per_language.entry(features.language).or_default();
        stats.0 += 1;
        if predicted == example.label {
            stats.1 += 1;
        }

        if let Some(days) = example.max_staleness_days {
            sla_total += 1;
            if features.staleness_horizon_days <= f64::from(days) {
                sla_hits += 1;
            }
        }
    }

    let per_language: BTreeMap<Language, LanguageStats> = per_language
        .into_iter()
        .map(|(language, (total, agreed))| {
            let stats = LanguageStats {
                examples: total,
                agreement: ratio(agreed, total).unwrap_or(0.0),
            };
            (language, stats)
        })
        .collect();
    let cross_lingual_gap = per_language.get(&Language::En).map_or_else(
        BTreeMap::new,
        |reference| {
            per_language
                .iter()
                .filter(|(language, _)| **language != Language::En)
                .map(|(language, stats)| (*language, stats.agreement - reference.agreement))
                .collect()
        },
    );

    let latencies: Vec<f64> = examples.iter().filter_map(|e| e.latency_ms).collect();
    let latency = percentile(&latencies, 50.0)
        .zip(percentile(&latencies, 95.0))
        .map(|(p50, p95)| LatencyPercentiles { p50, p95 });

    let points: Vec<ParetoPoint> = examples
        .iter()
        .filter_map(|e| {
            e.truthfulness
                .zip(e.latency_ms)
                .map(|(truthfulness, latency_ms)| ParetoPoint {
                    truthfulness,
                    latency_ms,
                })
        })
        .collect();

    let (recall, precision) = gating_metrics(&predictions);
    let accuracy = confusion.accuracy();
    EvaluationReport {
        model_version: policy.model_version().to_string(),
        examples: confusion.total(),
        confusion,
        accuracy,
        retrieve_when_needed_recall: recall,
        parametric_when_safe_precision: precision,
        freshness_sla_hit_rate: ratio(sla_hits, sla_total),
        per_language,
        cross_lingual_gap,
        latency,
        cost_per_supported: cost_per_supported(examples),
        pareto_frontier: pareto_frontier(&points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Config;
    use crate::infrastructure::gating::HeuristicGatingModel;
    use std::sync::Arc;
    use std::time::Duration;

    fn example(label: ActionKind, needs_retrieval: bool, safe_parametric: bool) -> LabelledExample {
        LabelledExample {
            query: "q".to_string(),
            language: None,
            label,
            needs_retrieval,
            safe_parametric,
            max_staleness_days: None,
            metadata: QueryMetadata::default(),
            latency_ms: None,
            cost_tokens: None,
            supported: None,
            truthfulness: None,
        }
    }

    #[test]
    fn test_parse_dataset_skips_blank_and_comment_lines() {
        let data = "# header\n\n{\"query\": \"2+2\", \"label\": \"compute\"}\n{\"query\": \"x\", \"label\": \"abstain\"}\n";
        let examples = parse_dataset(data.as_bytes()).expect("valid dataset");
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].label, ActionKind::Compute);
        assert!(examples[0].safe_parametric);
        assert_eq!(examples[1].label, ActionKind::Escalate);
    }

    #[test]
    fn test_parse_dataset_reports_line() {
        let err = parse_dataset("{\"query\": \"a\", \"label\": \"compute\"}\nnot json\n".as_bytes())
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_gating_metrics() {
        let needs = example(ActionKind::Retrieve, true, false);
        let safe = example(ActionKind::Parametric, false, true);
        let unsafe_param = example(ActionKind::Retrieve, true, false);
        let predictions = vec![
            (ActionKind::Retrieve, &needs),
            (ActionKind::Parametric, &safe),
            (ActionKind::Parametric, &unsafe_param),
        ];
        let (recall, precision) = gating_metrics(&predictions);
        assert_eq!(recall, Some(0.5));
        assert_eq!(precision, Some(0.5));
        assert_eq!(gating_metrics(&[]), (None, None));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        let p95 = percentile(&values, 95.0).expect("non-empty");
        assert!((p95 - 4.8).abs() < 1e-9);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_pareto_frontier_drops_dominated_points() {
        let point = |truthfulness, latency_ms| ParetoPoint {
            truthfulness,
            latency_ms,
        };
        let frontier = pareto_frontier(&[
            point(0.9, 2000.0),
            point(0.8, 2500.0),
            point(0.7, 500.0),
            point(0.95, 3000.0),
        ]);
        assert_eq!(
            frontier,
            vec![point(0.95, 3000.0), point(0.9, 2000.0), point(0.7, 500.0)]
        );
    }

    #[test]
    fn test_cost_per_supported() {
        let mut a = example(ActionKind::Parametric, false, true);
        a.cost_tokens = Some(300.0);
        a.supported = Some(true);
        let mut b = example(ActionKind::Retrieve, true, false);
        b.cost_tokens = Some(900.0);
        b.supported = Some(false);
        assert_eq!(cost_per_supported(&[a.clone(), b]), Some(1200.0));
        a.supported = Some(false);
        assert_eq!(cost_per_supported(&[a]), None);
    }

    #[test]
    fn test_evaluate_policy_counts_every_example() {
        let config = Config::default();
        let policy = GatingPolicy::new(
            Arc::new(HeuristicGatingModel),
            config.gating.clone(),
            config.costs.clone(),
        );
        let budget = BudgetSnapshot {
            remaining_latency: Duration::from_secs(10),
            remaining_tokens: 4096,
            deadline: chrono::Utc::now() + chrono::Duration::seconds(10),
            expired: false,
        };
        let mut compute = example(ActionKind::Compute, false, true);
        compute.query = "What is 12 * (7 + 5)?".to_string();
        let mut spanish = example(ActionKind::Retrieve, true, false);
        spanish.query = "¿Quién ganó las elecciones ayer en España?".to_string();
        spanish.max_staleness_days = Some(3);

        let report = evaluate_policy(
            &FeatureExtractor::default(),
            &policy,
            &budget,
            &[compute, spanish],
        );
        assert_eq!(report.examples, 2);
        assert_eq!(report.confusion.count(ActionKind::Compute, ActionKind::Compute), 1);
        assert_eq!(report.model_version, "heuristic-v1");
        assert!(report.freshness_sla_hit_rate.is_some());
    }
}
