use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::action::ActionKind;
use super::budget::Cost;

/// Main configuration structure for Janus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Default per-query budget
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Per-unit cost estimates used for reservations
    #[serde(default)]
    pub costs: CostsConfig,

    /// Gating policy configuration
    #[serde(default)]
    pub gating: GatingConfig,

    /// Acceptance thresholds
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Retry and speculative execution
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub features: FeaturesConfig,

    /// External service endpoints
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,

    /// Label store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Budget granted to a query when the request does not override it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BudgetConfig {
    /// Latency allowance in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Token allowance
    #[serde(default = "default_tokens")]
    pub tokens: u64,

    /// Deadline relative to arrival, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

const fn default_latency_ms() -> u64 {
    6000
}

const fn default_tokens() -> u64 {
    2048
}

const fn default_deadline_ms() -> u64 {
    10_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            tokens: default_tokens(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl BudgetConfig {
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn deadline(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.deadline_ms).unwrap_or(i64::MAX))
    }
}

/// A configured cost estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CostEstimate {
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub latency_ms: u64,
}

impl CostEstimate {
    pub const fn new(tokens: u64, latency_ms: u64) -> Self {
        Self { tokens, latency_ms }
    }

    pub const fn cost(self) -> Cost {
        Cost::from_millis(self.tokens, self.latency_ms)
    }
}

/// Cost estimates per unit of external work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CostsConfig {
    /// One LM generation call; `tokens` also caps the generation length
    #[serde(default = "default_generation_cost")]
    pub generation: CostEstimate,

    #[serde(default = "default_search_cost")]
    pub search: CostEstimate,

    #[serde(default = "default_tool_cost")]
    pub tool: CostEstimate,

    /// Fixed cost of composing a clarification question
    #[serde(default = "default_clarification_cost")]
    pub clarification: CostEstimate,

    #[serde(default = "default_verification_cost")]
    pub verification: CostEstimate,

    /// Bookkeeping reserved by the orchestrator before each dispatch
    #[serde(default = "default_dispatch_cost")]
    pub dispatch: CostEstimate,
}

const fn default_generation_cost() -> CostEstimate {
    CostEstimate::new(512, 1500)
}

const fn default_search_cost() -> CostEstimate {
    CostEstimate::new(0, 300)
}

const fn default_tool_cost() -> CostEstimate {
    CostEstimate::new(0, 200)
}

const fn default_clarification_cost() -> CostEstimate {
    CostEstimate::new(32, 50)
}

const fn default_verification_cost() -> CostEstimate {
    CostEstimate::new(256, 800)
}

const fn default_dispatch_cost() -> CostEstimate {
    CostEstimate::new(0, 5)
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            generation: default_generation_cost(),
            search: default_search_cost(),
            tool: default_tool_cost(),
            clarification: default_clarification_cost(),
            verification: default_verification_cost(),
            dispatch: default_dispatch_cost(),
        }
    }
}

impl CostsConfig {
    /// Smallest cost an executor for `action` must reserve to produce anything.
    pub fn minimum_for(&self, action: ActionKind) -> Cost {
        match action {
            ActionKind::Parametric => self.generation.cost(),
            ActionKind::Retrieve => self.search.cost().saturating_add(self.generation.cost()),
            ActionKind::Compute => self.tool.cost(),
            ActionKind::Clarify => self.clarification.cost(),
            ActionKind::Escalate => Cost::ZERO,
        }
    }
}

/// Gating policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatingConfig {
    /// Ambiguity above which Clarify is forced to the top
    #[serde(default = "default_clarify_threshold")]
    pub clarify_ambiguity_threshold: f64,

    /// Multiplier applied to confidences of degraded feature vectors
    #[serde(default = "default_degraded_factor")]
    pub degraded_confidence_factor: f64,

    /// Optional JSON linear model; the built-in heuristic is used otherwise
    #[serde(default)]
    pub model_path: Option<String>,
}

const fn default_clarify_threshold() -> f64 {
    0.6
}

const fn default_degraded_factor() -> f64 {
    0.5
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            clarify_ambiguity_threshold: default_clarify_threshold(),
            degraded_confidence_factor: default_degraded_factor(),
            model_path: None,
        }
    }
}

/// Acceptance rules applied to verified candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VerificationConfig {
    /// Minimum truthfulness score
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,

    /// Minimum citation precision for actions that must cite
    #[serde(default = "default_accept_threshold")]
    pub citation_threshold: f64,

    #[serde(default = "default_citation_actions")]
    pub require_citations_for: Vec<ActionKind>,

    /// Actions accepted without calling the scorer
    #[serde(default)]
    pub unverified_actions: Vec<ActionKind>,
}

const fn default_accept_threshold() -> f64 {
    0.8
}

fn default_citation_actions() -> Vec<ActionKind> {
    vec![ActionKind::Retrieve]
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            citation_threshold: default_accept_threshold(),
            require_citations_for: default_citation_actions(),
            unverified_actions: Vec::new(),
        }
    }
}

impl VerificationConfig {
    pub fn requires_citations(&self, action: ActionKind) -> bool {
        self.require_citations_for.contains(&action)
    }

    pub fn requires_verification(&self, action: ActionKind) -> bool {
        !self.unverified_actions.contains(&action)
    }
}

/// Retry and speculation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Attempts after the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub speculative: SpeculativeConfig,
}

const fn default_max_retries() -> u32 {
    2
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            speculative: SpeculativeConfig::default(),
        }
    }
}

/// Parallel execution of the top two actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpeculativeConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Only speculate when the top two confidences are this close
    #[serde(default = "default_max_confidence_gap")]
    pub max_confidence_gap: f64,
}

const fn default_max_confidence_gap() -> f64 {
    0.2
}

impl Default for SpeculativeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_confidence_gap: default_max_confidence_gap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Passages requested per search
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

const fn default_temperature() -> f64 {
    0.2
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeaturesConfig {
    /// Longer queries are truncated and flagged degraded
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

const fn default_max_query_chars() -> usize {
    4096
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            max_query_chars: default_max_query_chars(),
        }
    }
}

/// Base URLs of the external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CollaboratorsConfig {
    #[serde(default)]
    pub lm_url: Option<String>,

    #[serde(default)]
    pub retrieval_url: Option<String>,

    #[serde(default)]
    pub scorer_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            lm_url: None,
            retrieval_url: None,
            scorer_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Persist every resolution to the label store
    #[serde(default = "default_record_resolutions")]
    pub record_resolutions: bool,
}

fn default_database_path() -> String {
    ".janus/janus.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_record_resolutions() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            record_resolutions: default_record_resolutions(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            retention_days: default_retention_days(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_costs_follow_estimates() {
        let costs = CostsConfig::default();
        assert_eq!(costs.minimum_for(ActionKind::Parametric), Cost::from_millis(512, 1500));
        assert_eq!(costs.minimum_for(ActionKind::Retrieve), Cost::from_millis(512, 1800));
        assert_eq!(costs.minimum_for(ActionKind::Escalate), Cost::ZERO);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r"
verification:
  accept_threshold: 0.9
costs:
  search:
    latency_ms: 100
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert!((config.verification.accept_threshold - 0.9).abs() < f64::EPSILON);
        assert!((config.verification.citation_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.costs.search, CostEstimate::new(0, 100));
        assert_eq!(config.costs.generation, CostEstimate::new(512, 1500));
        assert!(config.verification.requires_citations(ActionKind::Retrieve));
        assert!(!config.verification.requires_citations(ActionKind::Parametric));
    }
}
