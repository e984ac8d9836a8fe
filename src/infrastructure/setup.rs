//! Janus setup and composition root
//!
//! Handles:
//! - Project initialization (`.janus/` directory and default config file)
//! - Gating model selection (trained linear weights or the built-in heuristic)
//! - Collaborator adapters from configured URLs
//! - Label store selection (SQLite or discard)
//! - Wiring everything into an [`AnswerService`]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::application::{AnswerService, Orchestrator};
use crate::domain::models::{CollaboratorsConfig, Config, GatingConfig};
use crate::domain::ports::{
    GatingModel, LabelStore, LanguageModel, NullLabelStore, RetrievalIndex, ToolRuntime,
    TruthScorer,
};
use crate::infrastructure::config::loader::CONFIG_DIR;
use crate::infrastructure::database::{DatabaseConnection, SqliteLabelStore};
use crate::infrastructure::gating::{HeuristicGatingModel, LinearGatingModel};
use crate::infrastructure::http::{
    CollaboratorClient, HttpLanguageModel, HttpRetrievalIndex, HttpTruthScorer,
    UnconfiguredCollaborator,
};
use crate::infrastructure::tools::ArithmeticToolRuntime;
use crate::services::executors::ExecutorSet;
use crate::services::feature_extractor::FeatureExtractor;
use crate::services::gating_policy::GatingPolicy;
use crate::services::verifier::VerifierAdapter;

/// Default configuration template content
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Janus Configuration
# Override settings by editing this file, adding .janus/local.yaml, or setting
# environment variables with the JANUS_ prefix (use __ for nesting).
#
# Example environment variables:
#   export JANUS_BUDGET__TOKENS=4096
#   export JANUS_ORCHESTRATOR__SPECULATIVE__ENABLED=true
#   export JANUS_COLLABORATORS__LM_URL=http://localhost:8081
#   export JANUS_LOGGING__LEVEL=debug

# Default budget per query
budget:
  latency_ms: 6000
  tokens: 2048
  # Deadline relative to arrival
  deadline_ms: 10000

# Cost estimates reserved before each unit of external work
costs:
  generation: { tokens: 512, latency_ms: 1500 }
  search: { tokens: 0, latency_ms: 300 }
  tool: { tokens: 0, latency_ms: 200 }
  clarification: { tokens: 32, latency_ms: 50 }
  verification: { tokens: 256, latency_ms: 800 }
  dispatch: { tokens: 0, latency_ms: 5 }

gating:
  # Ambiguity above this promotes Clarify to the top
  clarify_ambiguity_threshold: 0.6
  # Multiplier for answer confidences when features are degraded
  degraded_confidence_factor: 0.5
  # Optional JSON file with linear softmax weights
  # model_path: ".janus/gating_model.json"

verification:
  accept_threshold: 0.8
  citation_threshold: 0.8
  require_citations_for: [retrieve]
  unverified_actions: []

orchestrator:
  max_retries: 2
  speculative:
    enabled: false
    max_confidence_gap: 0.2

retrieval:
  top_k: 3

generation:
  temperature: 0.2

features:
  max_query_chars: 4096

# External collaborators; unset URLs behave as unavailable services
collaborators:
  # lm_url: "http://localhost:8081"
  # retrieval_url: "http://localhost:8082"
  # scorer_url: "http://localhost:8083"
  request_timeout_ms: 5000

database:
  path: ".janus/janus.db"
  max_connections: 5
  record_resolutions: true

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"
  # Log format: json, pretty
  format: "pretty"
  retention_days: 30
  # log_dir: ".janus/logs"
"#;

/// Setup paths and directories
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl SetupPaths {
    /// Paths rooted at `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join(CONFIG_DIR);
        Self {
            config_file: config_dir.join("config.yaml"),
            config_dir,
        }
    }

    /// Paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::under(current_dir))
    }

    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }
}

/// Write the default configuration file. Returns `false` when one already
/// exists and `force` is not set.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    if paths.config_file.exists() && !force {
        return Ok(false);
    }

    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;
    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", paths.config_file.display()))?;

    Ok(true)
}

/// Gating model named by the config, or the built-in heuristic.
pub fn build_gating_model(config: &GatingConfig) -> Result<Arc<dyn GatingModel>> {
    match &config.model_path {
        Some(path) => {
            let model = LinearGatingModel::load(path)
                .with_context(|| format!("Failed to load gating model from {path}"))?;
            info!(path = %path, version = model.version(), "Loaded linear gating model");
            Ok(Arc::new(model))
        }
        None => Ok(Arc::new(HeuristicGatingModel::new())),
    }
}

/// External collaborators of one answering service.
#[derive(Clone)]
pub struct Collaborators {
    pub lm: Arc<dyn LanguageModel>,
    pub index: Arc<dyn RetrievalIndex>,
    pub tools: Arc<dyn ToolRuntime>,
    pub scorer: Arc<dyn TruthScorer>,
}

impl Collaborators {
    /// HTTP adapters for every configured URL; unset URLs become
    /// unavailable collaborators.
    pub fn from_config(config: &CollaboratorsConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = |name: &'static str, url: &str| CollaboratorClient::new(name, url, timeout);

        let lm: Arc<dyn LanguageModel> = match &config.lm_url {
            Some(url) => Arc::new(HttpLanguageModel::new(client("language model", url)?)),
            None => Arc::new(UnconfiguredCollaborator::new("language model")),
        };
        let index: Arc<dyn RetrievalIndex> = match &config.retrieval_url {
            Some(url) => Arc::new(HttpRetrievalIndex::new(client("retrieval index", url)?)),
            None => Arc::new(UnconfiguredCollaborator::new("retrieval index")),
        };
        let scorer: Arc<dyn TruthScorer> = match &config.scorer_url {
            Some(url) => Arc::new(HttpTruthScorer::new(client("truth scorer", url)?)),
            None => {
                warn!("No truth scorer configured; verified actions will escalate");
                Arc::new(UnconfiguredCollaborator::new("truth scorer"))
            }
        };

        Ok(Self {
            lm,
            index,
            tools: Arc::new(ArithmeticToolRuntime::new()),
            scorer,
        })
    }
}

/// Feature extractor and gating policy, the pure half of the loop.
pub fn build_policy(config: &Config) -> Result<(FeatureExtractor, GatingPolicy)> {
    let model = build_gating_model(&config.gating)?;
    Ok((
        FeatureExtractor::new(config.features.clone()),
        GatingPolicy::new(model, config.gating.clone(), config.costs.clone()),
    ))
}

/// Wire an orchestrator from explicit collaborators.
pub fn build_orchestrator(
    config: &Config,
    model: Arc<dyn GatingModel>,
    collaborators: Collaborators,
) -> Orchestrator {
    let extractor = FeatureExtractor::new(config.features.clone());
    let policy = GatingPolicy::new(model, config.gating.clone(), config.costs.clone());
    let executors = ExecutorSet::new(
        collaborators.lm,
        collaborators.index,
        collaborators.tools,
        config,
    );
    let verifier = VerifierAdapter::new(
        collaborators.scorer,
        config.costs.verification.cost(),
        config.verification.clone(),
    );
    Orchestrator::new(extractor, policy, executors, verifier, config)
}

/// Open the configured label store and return it with the pool, if any.
pub async fn open_label_store(
    config: &Config,
) -> Result<(Arc<dyn LabelStore>, Option<DatabaseConnection>)> {
    if !config.database.record_resolutions {
        return Ok((Arc::new(NullLabelStore::new()), None));
    }
    let db = DatabaseConnection::open(&config.database.path, config.database.max_connections)
        .await
        .context("Failed to open label store database")?;
    db.migrate().await?;
    let store = SqliteLabelStore::new(db.pool().clone());
    Ok((Arc::new(store), Some(db)))
}

/// Build the full answering service from configuration.
pub async fn build_answer_service(
    config: &Config,
) -> Result<(AnswerService, Option<DatabaseConnection>)> {
    let model = build_gating_model(&config.gating)?;
    let collaborators = Collaborators::from_config(&config.collaborators)?;
    let orchestrator = build_orchestrator(config, model, collaborators);
    let (labels, db) = open_label_store(config).await?;
    Ok((AnswerService::new(orchestrator, labels, config), db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ConfigLoader;
    use tempfile::TempDir;

    #[test]
    fn test_default_template_is_valid_config() {
        let config: Config =
            serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).expect("template should parse");
        ConfigLoader::validate(&config).expect("template should validate");
        assert_eq!(config.orchestrator.max_retries, 2);
        assert_eq!(config.costs.generation.tokens, 512);
    }

    #[test]
    fn test_create_config_file_respects_force() {
        let dir = TempDir::new().unwrap();
        let paths = SetupPaths::under(dir.path());
        assert!(!paths.is_initialized());

        assert!(create_config_file(&paths, false).unwrap());
        assert!(paths.is_initialized());
        fs::write(&paths.config_file, "budget: {}\n").unwrap();

        assert!(!create_config_file(&paths, false).unwrap());
        assert_eq!(fs::read_to_string(&paths.config_file).unwrap(), "budget: {}\n");

        assert!(create_config_file(&paths, true).unwrap());
        assert_eq!(
            fs::read_to_string(&paths.config_file).unwrap(),
            DEFAULT_CONFIG_TEMPLATE
        );
    }

    #[test]
    fn test_gating_model_defaults_to_heuristic() {
        let model = build_gating_model(&GatingConfig::default()).unwrap();
        assert_eq!(model.version(), HeuristicGatingModel::VERSION);

        let missing = GatingConfig {
            model_path: Some("/nonexistent/model.json".to_string()),
            ..GatingConfig::default()
        };
        assert!(build_gating_model(&missing).is_err());
    }

    #[tokio::test]
    async fn test_label_store_disabled() {
        let mut config = Config::default();
        config.database.record_resolutions = false;
        let (_, db) = open_label_store(&config).await.unwrap();
        assert!(db.is_none());
    }
}
