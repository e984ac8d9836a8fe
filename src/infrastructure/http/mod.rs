//! HTTP adapters for the external collaborators.
//!
//! Each adapter POSTs JSON to one endpoint of a configured base URL and maps
//! transport failures onto [`CollaboratorError`]: timeouts to `Timeout`,
//! connection problems and 5xx/429 to `Unavailable`, other 4xx to
//! `Rejected`, and undecodable bodies to `Malformed`.

pub mod client;
pub mod language_model;
pub mod retrieval;
pub mod scorer;
pub mod unconfigured;

pub use client::CollaboratorClient;
pub use language_model::HttpLanguageModel;
pub use retrieval::HttpRetrievalIndex;
pub use scorer::HttpTruthScorer;
pub use unconfigured::UnconfiguredCollaborator;
