//! Utilities for schema_diff
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{
    backticked_names, first_backticked, join_identifiers, quote_identifier, strip_auto_increment,
};
