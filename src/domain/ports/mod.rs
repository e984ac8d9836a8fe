//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces for the external collaborators of the answering loop:
//! - LanguageModel: LM inference engine
//! - RetrievalIndex: document search backend
//! - ToolRuntime: computation tools
//! - TruthScorer: truthfulness/citation scoring
//! - LabelStore: write-only sink for completed resolutions
//! - GatingModel: versioned scoring model consulted by the gating policy
//!
//! Each is injected per resolution, so tests can swap in doubles.

pub mod gating_model;
pub mod label_store;
pub mod language_model;
pub mod retrieval_index;
pub mod tool_runtime;
pub mod truth_scorer;

pub use gating_model::GatingModel;
pub use label_store::{LabelStore, NullLabelStore};
pub use language_model::{Generation, GenerationConstraints, LanguageModel};
pub use retrieval_index::RetrievalIndex;
pub use tool_runtime::{ToolOutput, ToolRuntime};
pub use truth_scorer::TruthScorer;
