//! Query feature extraction.
//!
//! Turns a [`Query`] into a fixed-shape [`FeatureVector`] using lexical
//! heuristics only. Extraction is total and deterministic: empty, unreadable
//! or over-long text produces a vector flagged `degraded` instead of an error.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::domain::models::{FeatureVector, FeaturesConfig, Language, Query};
use crate::services::freshness;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid regex"));

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").expect("valid regex"));

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[/.-]\d{1,2}[/.-](\d{4}|\d{2})\b").expect("valid regex")
});

static RELATIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(today|tonight|yesterday|tomorrow|currently|current|right now|this (week|month|year)|hoy|ayer|mañana|actualmente)\b",
    )
    .expect("valid regex")
});

static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(\.\d+)?\s*([-+*/^×÷]|\sx\s)\s*\(?\s*-?\d").expect("valid regex")
});

static COMPUTE_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(calculate|compute|square root|percent of|sum of|product of|divided by|multiplied by|calcula)\b")
        .expect("valid regex")
});

const STOP_WORDS: &[&str] = &[
    "the", "of", "and", "a", "an", "to", "in", "for", "on", "with", "at", "by", "from", "el", "la",
    "los", "las", "de", "del", "y", "en", "un", "una", "por", "con", "para",
];

/// Pronouns and vague nouns that point outside the query itself.
const DEICTIC_WORDS: &[&str] = &[
    "it", "this", "that", "these", "those", "they", "them", "he", "she", "him", "her", "there",
    "thing", "things", "stuff", "one", "eso", "esto", "ello",
];

const BREAKING_TOKENS: &[&str] = &[
    "breaking", "news", "update", "latest", "live", "últimas", "خبر",
];

/// Multi-word or unsegmented lexemes, matched as substrings.
const BREAKING_PHRASES: &[&str] = &["just in", "breaking news", "速報", "अभी अभी"];

/// Derives feature vectors from queries.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeaturesConfig,
}

impl FeatureExtractor {
    pub const fn new(config: FeaturesConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, query: &Query) -> FeatureVector {
        let metadata = *query.metadata();
        let raw = query.text().trim();

        let mut degraded = false;
        let text: String = if raw.chars().count() > self.config.max_query_chars {
            degraded = true;
            raw.chars().take(self.config.max_query_chars).collect()
        } else {
            raw.to_string()
        };
        if text.contains('\u{FFFD}') || !text.chars().any(char::is_alphanumeric) {
            degraded = true;
        }

        let language = query
            .declared_language()
            .unwrap_or_else(|| detect_language(&text));
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

        let entity_count = u32::try_from(ENTITY.find_iter(&text).count()).unwrap_or(u32::MAX);
        let has_time_expression = detect_time_expression(&text);
        let breaking_news = breaking_news_score(&lowered, &tokens);
        let ambiguity = if tokens.is_empty() {
            1.0
        } else {
            ambiguity_score(&tokens)
        };

        let volatility = metadata
            .volatility
            .unwrap_or_else(|| freshness::infer_volatility(breaking_news, has_time_expression));
        let staleness_horizon_days = freshness::staleness_horizon_days(volatility, breaking_news);
        let max_staleness_days = query.freshness().map(|f| f.max_staleness_days);

        let mut freshness_need = (2.0 * breaking_news)
            .max(if has_time_expression { 0.4 } else { 0.0 })
            .max(freshness::volatility_weight(volatility));
        match max_staleness_days {
            Some(days) if days <= 7 => freshness_need = freshness_need.max(0.8),
            Some(days) if days <= 30 => freshness_need = freshness_need.max(0.5),
            _ => {}
        }
        let freshness_need = freshness_need.clamp(0.0, 1.0);

        let risk = metadata.risk.encode();
        let mut internal_confidence = 0.8 - 0.5 * freshness_need - 0.2 * risk;
        if entity_count > 3 {
            internal_confidence -= 0.1;
        }
        if language != Language::En {
            internal_confidence -= 0.05;
        }
        let mut internal_confidence = internal_confidence.clamp(0.0, 1.0);
        if degraded {
            internal_confidence *= 0.5;
        }

        let needs_computation = !degraded && detect_computation(&text);

        if degraded {
            tracing::warn!(
                query_id = %query.id(),
                chars = raw.chars().count(),
                "Query text degraded; features flagged low-confidence"
            );
        }

        FeatureVector {
            language,
            entity_count,
            has_time_expression,
            ambiguity,
            breaking_news,
            freshness_need,
            internal_confidence,
            needs_computation,
            volatility,
            staleness_horizon_days,
            max_staleness_days,
            risk,
            domain: metadata.domain.encode(),
            degraded,
        }
    }
}

fn detect_time_expression(text: &str) -> bool {
    YEAR.is_match(text) || DATE.is_match(text) || RELATIVE_TIME.is_match(text)
}

fn detect_computation(text: &str) -> bool {
    let without_dates = DATE.replace_all(text, " ");
    ARITHMETIC.is_match(&without_dates) || COMPUTE_KEYWORDS.is_match(text)
}

fn ambiguity_score(tokens: &[&str]) -> f64 {
    let total = tokens.len() as f64;
    let stop = tokens.iter().filter(|t| STOP_WORDS.contains(*t)).count() as f64;
    let deictic = tokens.iter().filter(|t| DEICTIC_WORDS.contains(*t)).count() as f64;
    let short_penalty = if tokens.len() <= 2 { 0.3 } else { 0.0 };
    (0.5 * stop / total + deictic / total + short_penalty).clamp(0.0, 1.0)
}

/// Share of distinct tokens that are breaking-news vocabulary.
fn breaking_news_score(lowered: &str, tokens: &[&str]) -> f64 {
    let distinct: HashSet<&str> = tokens.iter().copied().collect();
    let token_hits = distinct
        .iter()
        .filter(|t| BREAKING_TOKENS.contains(*t))
        .count();
    let phrase_hits = BREAKING_PHRASES
        .iter()
        .filter(|p| lowered.contains(**p))
        .count();
    let denominator = distinct.len().max(1) as f64;
    ((token_hits + phrase_hits) as f64 / denominator).clamp(0.0, 1.0)
}

/// Guess a language from the dominant script of the text.
pub fn detect_language(text: &str) -> Language {
    let mut latin = 0usize;
    let mut devanagari = 0usize;
    let mut arabic = 0usize;
    let mut urdu_marks = 0usize;
    let mut kana = 0usize;
    let mut han = 0usize;
    let mut spanish_marks = 0usize;

    for c in text.chars() {
        match c {
            '\u{0900}'..='\u{097F}' => devanagari += 1,
            '\u{0600}'..='\u{06FF}' => {
                arabic += 1;
                if matches!(c, 'ٹ' | 'ڈ' | 'ڑ' | 'ں' | 'ے' | 'ہ' | 'ھ') {
                    urdu_marks += 1;
                }
            }
            '\u{3040}'..='\u{30FF}' => kana += 1,
            '\u{4E00}'..='\u{9FFF}' => han += 1,
            'ñ' | 'Ñ' | '¿' | '¡' | 'á' | 'é' | 'í' | 'ó' | 'ú' => {
                latin += 1;
                spanish_marks += 1;
            }
            c if c.is_ascii_alphabetic() => latin += 1,
            _ => {}
        }
    }

    let scripts = [latin, devanagari, arabic, kana + han];
    let dominant = scripts.iter().copied().max().unwrap_or(0);
    if dominant == 0 {
        return Language::Unknown;
    }
    if devanagari == dominant {
        Language::Hi
    } else if arabic == dominant {
        if urdu_marks > 0 {
            Language::Ur
        } else {
            Language::Ar
        }
    } else if kana + han == dominant {
        if kana > 0 {
            Language::Ja
        } else {
            Language::Zh
        }
    } else if spanish_marks > 0 {
        Language::Es
    } else {
        Language::En
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        FreshnessRequirement, QueryMetadata, RiskLevel, Volatility,
    };

    fn extract(query: &Query) -> FeatureVector {
        FeatureExtractor::default().extract(query)
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let query = Query::new("Who won the Champions League final in 2024?");
        assert_eq!(extract(&query), extract(&query));
    }

    #[test]
    fn test_breaking_news_raises_freshness_need() {
        let calm = extract(&Query::new("Explain how photosynthesis works in plants"));
        let urgent = extract(&Query::new("Breaking news: latest update on the election"));

        assert!(urgent.breaking_news > calm.breaking_news);
        assert!(urgent.freshness_need > calm.freshness_need);
        assert!(urgent.internal_confidence < calm.internal_confidence);
        assert_eq!(urgent.volatility, Volatility::Breaking);
        assert!(urgent.staleness_horizon_days < calm.staleness_horizon_days);
    }

    #[test]
    fn test_time_expressions() {
        assert!(extract(&Query::new("What happened today in Lagos?")).has_time_expression);
        assert!(extract(&Query::new("GDP of Peru in 2019")).has_time_expression);
        assert!(extract(&Query::new("Events on 12/05/2023")).has_time_expression);
        assert!(!extract(&Query::new("Why is the sky blue?")).has_time_expression);
    }

    #[test]
    fn test_vague_query_is_ambiguous() {
        let vague = extract(&Query::new("is it that one?"));
        let specific = extract(&Query::new("Boiling point of water at sea level in Celsius"));
        assert!(vague.ambiguity > 0.6);
        assert!(specific.ambiguity < 0.6);
    }

    #[test]
    fn test_empty_text_is_degraded() {
        let features = extract(&Query::new("   "));
        assert!(features.degraded);
        assert!((features.ambiguity - 1.0).abs() < f64::EPSILON);
        assert!(!features.needs_computation);

        let features = extract(&Query::new("?!?"));
        assert!(features.degraded);
    }

    #[test]
    fn test_overlong_text_is_truncated_and_degraded() {
        let extractor = FeatureExtractor::new(FeaturesConfig { max_query_chars: 10 });
        let features = extractor.extract(&Query::new("Population of Tokyo and Osaka combined"));
        assert!(features.degraded);
    }

    #[test]
    fn test_detects_arithmetic() {
        assert!(extract(&Query::new("What is 17 * (3 + 4)?")).needs_computation);
        assert!(extract(&Query::new("calculate the square root of 81")).needs_computation);
        assert!(!extract(&Query::new("Report for 12/05/2023")).needs_computation);
    }

    #[test]
    fn test_language_detection_by_script() {
        assert_eq!(detect_language("What is the capital of France?"), Language::En);
        assert_eq!(detect_language("¿Cuál es la capital de España?"), Language::Es);
        assert_eq!(detect_language("भारत की राजधानी क्या है?"), Language::Hi);
        assert_eq!(detect_language("پاکستان کا دارالحکومت کیا ہے؟"), Language::Ur);
        assert_eq!(detect_language("東京の天気は？"), Language::Ja);
        assert_eq!(detect_language("12345"), Language::Unknown);
    }

    #[test]
    fn test_declared_language_wins() {
        let query = Query::new("Capital of France?").with_language(Language::Es);
        assert_eq!(extract(&query).language, Language::Es);
    }

    #[test]
    fn test_metadata_and_freshness_requirement() {
        let query = Query::new("Interest rate set by the central bank")
            .with_freshness(FreshnessRequirement::days(3))
            .with_metadata(QueryMetadata {
                risk: RiskLevel::High,
                volatility: Some(Volatility::Fast),
                ..QueryMetadata::default()
            });
        let features = extract(&query);
        assert_eq!(features.max_staleness_days, Some(3));
        assert!(features.freshness_need >= 0.8);
        assert!((features.risk - 1.0).abs() < f64::EPSILON);
        assert_eq!(features.volatility, Volatility::Fast);
        assert!(features.internal_confidence < 0.3);
    }
}
