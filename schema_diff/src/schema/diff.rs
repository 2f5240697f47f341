//! Schema difference results
//!
//! [`DatabaseDiff`] is the classification of tables between two schemas,
//! [`ChangeSet`] the SQL produced from it.

use serde::{Deserialize, Serialize};

/// A base-only table that may have been renamed into a target-only one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTable {
    pub name: String,
    pub score: f64,
}

/// Target-only table with the base tables it may have been renamed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub table: String,
    /// Best match first
    pub candidates: Vec<ScoredTable>,
}

/// A rename the engine decided to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRename {
    pub from: String,
    pub to: String,
    pub score: f64,
}

/// Classification of tables between a base and a target schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDiff {
    /// Target-only tables to create
    pub added: Vec<String>,
    /// Target-only tables with rename candidates, pending resolution
    pub renames: Vec<RenameCandidate>,
    /// Tables present on both sides
    pub existing: Vec<String>,
    /// Base-only tables
    pub dropped: Vec<String>,
    pub warnings: Vec<String>,
}

impl DatabaseDiff {
    /// True when both schemas hold the same set of table names
    pub fn same_tables(&self) -> bool {
        self.added.is_empty() && self.renames.is_empty() && self.dropped.is_empty()
    }
}

/// SQL statements turning a base schema into a target schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub rename_tables: Vec<String>,
    pub create_tables: Vec<String>,
    pub alter_tables: Vec<String>,
    pub drop_tables: Vec<String>,
    pub warnings: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.rename_tables.is_empty()
            && self.create_tables.is_empty()
            && self.alter_tables.is_empty()
            && self.drop_tables.is_empty()
    }

    /// Non-empty sections in execution order, keyed by their script heading
    pub fn sections(&self) -> Vec<(&'static str, &[String])> {
        [
            ("renameTables", self.rename_tables.as_slice()),
            ("createTables", self.create_tables.as_slice()),
            ("alterTables", self.alter_tables.as_slice()),
            ("dropTables", self.drop_tables.as_slice()),
        ]
        .into_iter()
        .filter(|(_, statements)| !statements.is_empty())
        .collect()
    }

    pub fn statement_count(&self) -> usize {
        self.sections().iter().map(|(_, s)| s.len()).sum()
    }
}
