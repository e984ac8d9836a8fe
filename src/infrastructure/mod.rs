//! Infrastructure layer module
//!
//! Adapters and external integrations behind the domain ports:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Gating models (heuristic and JSON-loaded linear softmax)
//! - HTTP collaborators (LM engine, retrieval index, truth scorer)
//! - Local tool runtime (arithmetic)
//! - Label store persistence (SQLite with sqlx)
//! - Composition root

pub mod config;
pub mod database;
pub mod gating;
pub mod http;
pub mod logging;
pub mod setup;
pub mod tools;
