use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project-local configuration and data.
pub const CONFIG_DIR: &str = ".janus";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}. Must be between 0 and 1")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid budget: {0} must be greater than zero")]
    ZeroBudget(&'static str),

    #[error("Invalid top_k: {0}. Must be at least 1")]
    InvalidTopK(usize),

    #[error("Invalid temperature: {0}. Must be between 0 and 2")]
    InvalidTemperature(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Speculative execution needs max_retries of at least 1")]
    SpeculationWithoutRetries,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .janus/config.yaml (project config, created by `config init`)
    /// 3. .janus/local.yaml (project local overrides, optional)
    /// 4. Environment variables (JANUS_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")))
            .merge(Env::prefixed("JANUS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("JANUS_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.budget.latency_ms == 0 {
            return Err(ConfigError::ZeroBudget("budget.latency_ms"));
        }
        if config.budget.tokens == 0 {
            return Err(ConfigError::ZeroBudget("budget.tokens"));
        }
        if config.budget.deadline_ms == 0 {
            return Err(ConfigError::ZeroBudget("budget.deadline_ms"));
        }

        let thresholds = [
            (
                "gating.clarify_ambiguity_threshold",
                config.gating.clarify_ambiguity_threshold,
            ),
            (
                "gating.degraded_confidence_factor",
                config.gating.degraded_confidence_factor,
            ),
            (
                "verification.accept_threshold",
                config.verification.accept_threshold,
            ),
            (
                "verification.citation_threshold",
                config.verification.citation_threshold,
            ),
            (
                "orchestrator.speculative.max_confidence_gap",
                config.orchestrator.speculative.max_confidence_gap,
            ),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if config.orchestrator.speculative.enabled && config.orchestrator.max_retries == 0 {
            return Err(ConfigError::SpeculationWithoutRetries);
        }

        if config.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK(config.retrieval.top_k));
        }

        if !(0.0..=2.0).contains(&config.generation.temperature) {
            return Err(ConfigError::InvalidTemperature(
                config.generation.temperature,
            ));
        }

        if config.features.max_query_chars == 0 {
            return Err(ConfigError::ValidationFailed(
                "features.max_query_chars must be at least 1".to_string(),
            ));
        }

        for (name, url) in [
            ("collaborators.lm_url", &config.collaborators.lm_url),
            ("collaborators.retrieval_url", &config.collaborators.retrieval_url),
            ("collaborators.scorer_url", &config.collaborators.scorer_url),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::ValidationFailed(format!(
                        "{name} must be an http(s) URL, got '{url}'"
                    )));
                }
            }
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
