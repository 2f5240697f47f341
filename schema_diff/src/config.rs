//! Configuration handling for schema_diff

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Represents the complete schema_diff configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub compare: CompareConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let min = self.compare.min_rename_similarity;
        if !(0.0..=1.0).contains(&min) {
            return Err(Error::ConfigError(format!(
                "compare.min_rename_similarity must be within 0.0..=1.0, got {}",
                min
            )));
        }
        Ok(())
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    /// The schema that needs to change
    pub base: Option<String>,
    /// The schema we want to migrate towards
    pub target: Option<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            base: None,
            target: None,
            pool_size: Some(5),
            timeout_seconds: Some(30),
        }
    }
}

/// How tables are read from a schema source
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Parse full `SHOW CREATE TABLE` output
    #[default]
    Statements,
    /// Build tables from `SHOW COLUMNS` rows only
    Columns,
}

/// What to do with a target-only table that matches base-only tables
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenamePolicy {
    /// Rename when exactly one candidate exists, otherwise create a new table
    #[default]
    Auto,
    /// Report candidates as warnings and always create a new table
    ReportOnly,
}

/// Comparison behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CompareConfig {
    pub create: bool,
    pub alter: bool,
    pub purge: bool,
    pub drop: bool,
    pub foreign_keys: bool,
    pub detect_renames: bool,
    pub min_rename_similarity: f64,
    pub rename_policy: RenamePolicy,
    pub load_mode: LoadMode,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            create: false,
            alter: false,
            purge: false,
            drop: false,
            foreign_keys: false,
            detect_renames: false,
            min_rename_similarity: 0.5,
            rename_policy: RenamePolicy::Auto,
            load_mode: LoadMode::Statements,
        }
    }
}

impl CompareConfig {
    /// True when at least one of the create/alter/drop passes is enabled
    pub fn has_work(&self) -> bool {
        self.create || self.alter || self.drop
    }
}

/// Output format of the generated script
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Sql,
    Json,
}

/// Script output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub file: Option<String>,
    pub format: OutputFormat,
    pub header: bool,
    pub disable_foreign_key_checks: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: None,
            format: OutputFormat::Sql,
            header: true,
            disable_foreign_key_checks: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        }
    }
}
