//! Error types for schema_diff

use thiserror::Error;

/// Result type for schema_diff operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_diff
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: unable to parse `{line}` (statement: {statement})")]
    ParseError { line: String, statement: String },

    #[error("Unresolved dependency: table {table} references {dependency}, which does not exist")]
    UnresolvedDependency { table: String, dependency: String },

    #[error("Duplicate name: {owner} already contains a {kind} named `{name}`")]
    DuplicateName {
        kind: &'static str,
        name: String,
        owner: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Build a parse error for a single line of a larger statement
    pub fn parse(line: impl Into<String>, statement: impl Into<String>) -> Self {
        Error::ParseError {
            line: line.into(),
            statement: statement.into(),
        }
    }

    /// Attach the enclosing statement to a parse error raised by a sub-element
    pub fn in_statement(self, statement: &str) -> Self {
        match self {
            Error::ParseError { line, .. } => Error::ParseError {
                line,
                statement: statement.to_string(),
            },
            other => other,
        }
    }

    /// Build a duplicate-name error
    pub fn duplicate(kind: &'static str, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Error::DuplicateName {
            kind,
            name: name.into(),
            owner: owner.into(),
        }
    }
}

/// Convert Serde JSON errors to schema_diff errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_diff errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
