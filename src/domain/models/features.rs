use serde::{Deserialize, Serialize};

use super::query::{Language, Volatility};

/// Fixed-shape signal vector derived from one query.
///
/// Scores are normalised to `[0.0, 1.0]`. `degraded` marks vectors built
/// from empty, unreadable or truncated text; every consumer must treat such
/// a vector as low-confidence rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Declared language, or the one detected from the text's script.
    pub language: Language,
    /// Count of capitalised, entity-like tokens.
    pub entity_count: u32,
    /// Whether the text mentions a date, year or relative day.
    pub has_time_expression: bool,
    /// How under-specified the query is.
    pub ambiguity: f64,
    /// Share of tokens that read like breaking-news vocabulary.
    pub breaking_news: f64,
    /// How strongly the answer depends on recent information.
    pub freshness_need: f64,
    /// Estimated confidence of a purely parametric answer.
    pub internal_confidence: f64,
    /// Whether the query contains an arithmetic task.
    pub needs_computation: bool,
    /// Volatility used for the staleness horizon (declared or inferred).
    pub volatility: Volatility,
    /// Days before a parametric answer is expected to go stale.
    pub staleness_horizon_days: f64,
    /// Caller's tolerated staleness, if declared.
    pub max_staleness_days: Option<u32>,
    /// Encoded risk level (0, 0.5, 1).
    pub risk: f64,
    /// Encoded subject domain (0..=4).
    pub domain: f64,
    pub degraded: bool,
}

impl FeatureVector {
    /// Width of [`as_array`](Self::as_array).
    pub const DIMENSIONS: usize = 10;

    /// Names of the numeric features, in [`as_array`](Self::as_array) order.
    pub const NAMES: [&'static str; Self::DIMENSIONS] = [
        "entity_count",
        "has_time_expression",
        "ambiguity",
        "breaking_news",
        "freshness_need",
        "internal_confidence",
        "needs_computation",
        "max_staleness_days",
        "risk",
        "domain",
    ];

    /// Numeric encoding consumed by learned gating models.
    pub fn as_array(&self) -> [f64; Self::DIMENSIONS] {
        [
            f64::from(self.entity_count),
            bool_to_f64(self.has_time_expression),
            self.ambiguity,
            self.breaking_news,
            self.freshness_need,
            self.internal_confidence,
            bool_to_f64(self.needs_computation),
            self.max_staleness_days.map_or(0.0, f64::from),
            self.risk,
            self.domain,
        ]
    }
}

const fn bool_to_f64(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_array_order_matches_names() {
        let features = FeatureVector {
            language: Language::En,
            entity_count: 2,
            has_time_expression: true,
            ambiguity: 0.1,
            breaking_news: 0.2,
            freshness_need: 0.3,
            internal_confidence: 0.4,
            needs_computation: false,
            volatility: Volatility::Fast,
            staleness_horizon_days: 24.0,
            max_staleness_days: Some(7),
            risk: 0.5,
            domain: 2.0,
            degraded: false,
        };

        let values = features.as_array();
        assert_eq!(values.len(), FeatureVector::NAMES.len());
        assert!((values[0] - 2.0).abs() < f64::EPSILON);
        assert!((values[1] - 1.0).abs() < f64::EPSILON);
        assert!((values[7] - 7.0).abs() < f64::EPSILON);
        assert!((values[9] - 2.0).abs() < f64::EPSILON);
    }
}
