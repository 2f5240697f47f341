//! Schema module for schema_diff
//!
//! This module holds the DDL model, the table and database comparison
//! algorithms and the script generator.

pub mod compare;
pub mod database;
pub mod diff;
pub mod element;
pub mod field;
pub mod foreign_key;
pub mod generator;
pub mod index;
pub mod primary_key;
pub mod table;

// Re-export key types
pub use compare::CompareEngine;
pub use database::{Database, TableId};
pub use diff::{ChangeSet, DatabaseDiff, RenameCandidate, ScoredTable, TableRename};
pub use element::{LineKind, SchemaElement};
pub use field::{ColumnInfo, Field};
pub use foreign_key::ForeignKey;
pub use generator::ScriptGenerator;
pub use index::{Index, IndexKind};
pub use primary_key::PrimaryKey;
pub use table::{diff_tables, AlterOptions, AlterPlan, Table, TableDiff};
