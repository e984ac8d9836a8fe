use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Language of a query, detected from script or declared by the caller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Hi,
    Ur,
    Ar,
    Zh,
    Ja,
    Unknown,
}

impl Language {
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Hi => "hi",
            Self::Ur => "ur",
            Self::Ar => "ar",
            Self::Zh => "zh",
            Self::Ja => "ja",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "es" | "spanish" => Ok(Self::Es),
            "hi" | "hindi" => Ok(Self::Hi),
            "ur" | "urdu" => Ok(Self::Ur),
            "ar" | "arabic" => Ok(Self::Ar),
            "zh" | "chinese" => Ok(Self::Zh),
            "ja" | "japanese" => Ok(Self::Ja),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Maximum staleness the caller tolerates for facts in the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessRequirement {
    pub max_staleness_days: u32,
}

impl FreshnessRequirement {
    pub const fn days(max_staleness_days: u32) -> Self {
        Self { max_staleness_days }
    }
}

/// Risk level declared for the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    #[serde(alias = "medium")]
    Med,
    High,
}

impl RiskLevel {
    pub const fn encode(self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Med => 0.5,
            Self::High => 1.0,
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "med" | "medium" => Ok(Self::Med),
            "high" => Ok(Self::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Subject domain declared for the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDomain {
    #[default]
    General,
    Medical,
    Finance,
    Science,
    Other,
}

impl QueryDomain {
    pub const fn encode(self) -> f64 {
        match self {
            Self::General => 0.0,
            Self::Medical => 1.0,
            Self::Finance => 2.0,
            Self::Science => 3.0,
            Self::Other => 4.0,
        }
    }
}

impl FromStr for QueryDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "medical" => Ok(Self::Medical),
            "finance" => Ok(Self::Finance),
            "science" => Ok(Self::Science),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown domain: {other}")),
        }
    }
}

/// How quickly facts about the query's subject change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Timeless,
    Slow,
    Fast,
    Breaking,
}

impl FromStr for Volatility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timeless" => Ok(Self::Timeless),
            "slow" => Ok(Self::Slow),
            "fast" => Ok(Self::Fast),
            "breaking" => Ok(Self::Breaking),
            other => Err(format!("unknown volatility: {other}")),
        }
    }
}

/// Optional request metadata that sharpens the gating signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryMetadata {
    #[serde(default)]
    pub risk: RiskLevel,
    #[serde(default)]
    pub domain: QueryDomain,
    #[serde(default)]
    pub volatility: Option<Volatility>,
}

/// An incoming question. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    id: Uuid,
    text: String,
    language: Option<Language>,
    arrived_at: DateTime<Utc>,
    freshness: Option<FreshnessRequirement>,
    deadline: Option<DateTime<Utc>>,
    metadata: QueryMetadata,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            language: None,
            arrived_at: Utc::now(),
            freshness: None,
            deadline: None,
            metadata: QueryMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    #[must_use]
    pub fn with_freshness(mut self, freshness: FreshnessRequirement) -> Self {
        self.freshness = Some(freshness);
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: QueryMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Language declared by the caller, if any.
    pub const fn declared_language(&self) -> Option<Language> {
        self.language
    }

    pub const fn arrived_at(&self) -> DateTime<Utc> {
        self.arrived_at
    }

    pub const fn freshness(&self) -> Option<FreshnessRequirement> {
        self.freshness
    }

    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub const fn metadata(&self) -> &QueryMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let deadline = Utc::now() + chrono::Duration::seconds(5);
        let query = Query::new("What is the capital of France?")
            .with_language(Language::En)
            .with_freshness(FreshnessRequirement::days(30))
            .with_deadline(deadline);

        assert_eq!(query.text(), "What is the capital of France?");
        assert_eq!(query.declared_language(), Some(Language::En));
        assert_eq!(query.freshness().map(|f| f.max_staleness_days), Some(30));
        assert_eq!(query.deadline(), Some(deadline));
        assert_eq!(query.metadata().risk, RiskLevel::Low);
    }

    #[test]
    fn test_metadata_encoding() {
        assert!((RiskLevel::Med.encode() - 0.5).abs() < f64::EPSILON);
        assert!((QueryDomain::Science.encode() - 3.0).abs() < f64::EPSILON);
        assert_eq!("medium".parse::<RiskLevel>(), Ok(RiskLevel::Med));
        assert_eq!("breaking".parse::<Volatility>(), Ok(Volatility::Breaking));
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("ur".parse::<Language>(), Ok(Language::Ur));
        assert_eq!("Spanish".parse::<Language>(), Ok(Language::Es));
        assert!("klingon".parse::<Language>().is_err());
    }
}
