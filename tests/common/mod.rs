//! Common test utilities for integration tests
//!
//! Scripted collaborator doubles and builders shared by the orchestrator,
//! property and storage tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use janus::application::{budget_for, Orchestrator};
use janus::domain::errors::CollaboratorError;
use janus::domain::models::{
    ActionKind, Citation, Config, EvidencePassage, FeatureVector, Language, Query,
    VerificationResult,
};
use janus::domain::ports::{
    GatingModel, Generation, GenerationConstraints, LanguageModel, RetrievalIndex, TruthScorer,
};
use janus::infrastructure::setup::{build_orchestrator, Collaborators};
use janus::infrastructure::tools::ArithmeticToolRuntime;
use janus::services::BudgetController;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Language model that answers every prompt with the same text.
pub struct ScriptedLm {
    reply: Result<Generation, CollaboratorError>,
    calls: AtomicUsize,
}

impl ScriptedLm {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(Generation {
                text: text.to_string(),
                token_cost: 64,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: CollaboratorError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedLm {
    async fn generate(
        &self,
        _prompt: &str,
        _constraints: &GenerationConstraints,
    ) -> Result<Generation, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

/// Retrieval index returning a fixed set of passages.
pub struct StaticIndex {
    passages: Vec<EvidencePassage>,
}

impl StaticIndex {
    pub fn new(passages: Vec<EvidencePassage>) -> Arc<Self> {
        Arc::new(Self { passages })
    }

    /// Two passages published an hour ago.
    pub fn fresh() -> Arc<Self> {
        let published = Some(Utc::now() - ChronoDuration::hours(1));
        Self::new(vec![
            EvidencePassage {
                document_id: "news-1".to_string(),
                span: "A magnitude 6.1 earthquake struck near Tokyo this morning.".to_string(),
                score: 0.93,
                published_at: published,
            },
            EvidencePassage {
                document_id: "news-2".to_string(),
                span: "No tsunami warning was issued.".to_string(),
                score: 0.81,
                published_at: published,
            },
        ])
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl RetrievalIndex for StaticIndex {
    async fn search(
        &self,
        _query: &str,
        _language: Language,
        k: usize,
    ) -> Result<Vec<EvidencePassage>, CollaboratorError> {
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

/// Truth scorer that replays a script; the last reply repeats.
pub struct ScriptedScorer {
    script: Mutex<VecDeque<Result<VerificationResult, CollaboratorError>>>,
    calls: AtomicUsize,
}

impl ScriptedScorer {
    pub fn new(script: Vec<Result<VerificationResult, CollaboratorError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(truthfulness: f64, citation_precision: f64) -> Arc<Self> {
        Self::new(vec![Ok(VerificationResult::new(
            truthfulness,
            citation_precision,
        ))])
    }

    pub fn unreachable() -> Arc<Self> {
        Self::new(vec![Err(CollaboratorError::Unavailable(
            "connection refused".to_string(),
        ))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TruthScorer for ScriptedScorer {
    async fn score(
        &self,
        _candidate_text: &str,
        _citations: &[Citation],
        _evidence: &[EvidencePassage],
    ) -> Result<VerificationResult, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        if script.len() > 1 {
            script
                .pop_front()
                .unwrap_or_else(|| Err(CollaboratorError::Timeout))
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(CollaboratorError::Timeout))
        }
    }
}

/// Gating model with fixed scores, indexed by `ActionKind::index`.
pub struct FixedGatingModel {
    scores: [f64; 5],
}

impl FixedGatingModel {
    pub const VERSION: &'static str = "fixed-test-v1";

    pub fn new(ranked: &[(ActionKind, f64)]) -> Arc<Self> {
        let mut scores = [0.0; 5];
        for (action, score) in ranked {
            scores[action.index()] = *score;
        }
        Arc::new(Self { scores })
    }
}

impl GatingModel for FixedGatingModel {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn score(&self, _features: &FeatureVector) -> [f64; 5] {
        self.scores
    }
}

/// Orchestrator over the given doubles and the real arithmetic tool.
pub fn orchestrator(
    config: &Config,
    model: Arc<dyn GatingModel>,
    lm: Arc<dyn LanguageModel>,
    index: Arc<dyn RetrievalIndex>,
    scorer: Arc<dyn TruthScorer>,
) -> Orchestrator {
    build_orchestrator(
        config,
        model,
        Collaborators {
            lm,
            index,
            tools: Arc::new(ArithmeticToolRuntime::new()),
            scorer,
        },
    )
}

/// Default budget from `config` for `query`.
pub fn budget(query: &Query, config: &Config) -> BudgetController {
    budget_for(query, &config.budget, None, None)
}

/// Budget with explicit token and latency allowances.
pub fn budget_with(query: &Query, config: &Config, tokens: u64, latency_ms: u64) -> BudgetController {
    budget_for(query, &config.budget, Some(latency_ms), Some(tokens))
}
