//! Database module for schema_diff
//!
//! This module handles connections and reading schema definitions.

pub mod connection;
pub mod loader;
pub mod source;

// Re-export key types
pub use connection::DatabaseConnection;
pub use loader::{load_database, LoadOptions};
pub use source::{MySqlSource, SchemaSource, StaticSource};
