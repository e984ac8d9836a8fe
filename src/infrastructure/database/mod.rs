//! `SQLite` persistence for resolution records.

pub mod connection;
pub mod label_store;

pub use connection::DatabaseConnection;
pub use label_store::SqliteLabelStore;
