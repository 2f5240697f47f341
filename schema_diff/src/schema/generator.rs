//! Script generator
//!
//! Renders a [`ChangeSet`] as a SQL script or a JSON document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;
use crate::schema::diff::ChangeSet;

/// JSON shape of a rendered change set
#[derive(Debug, Serialize)]
struct ScriptDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    changes: &'a ChangeSet,
}

/// Migration script generator
pub struct ScriptGenerator<'a> {
    config: &'a OutputConfig,
}

impl<'a> ScriptGenerator<'a> {
    /// Create a new script generator
    pub fn new(config: &'a OutputConfig) -> Self {
        Self { config }
    }

    /// Render in the configured format
    pub fn render(&self, changes: &ChangeSet) -> Result<String> {
        match self.config.format {
            OutputFormat::Sql => Ok(self.render_sql(changes)),
            OutputFormat::Json => self.render_json(changes),
        }
    }

    /// Render the change set as an executable SQL script
    pub fn render_sql(&self, changes: &ChangeSet) -> String {
        let mut lines = Vec::new();

        if self.config.header {
            lines.push("-- schema_diff migration script".to_string());
            lines.push(format!(
                "-- Generated: {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        for warning in &changes.warnings {
            lines.push(format!("-- WARNING: {}", warning));
        }

        if self.config.disable_foreign_key_checks {
            lines.push("SET FOREIGN_KEY_CHECKS=0;".to_string());
        }
        for (heading, statements) in changes.sections() {
            lines.push(format!("-- {}", heading));
            lines.extend(statements.iter().cloned());
        }
        if self.config.disable_foreign_key_checks {
            lines.push("SET FOREIGN_KEY_CHECKS=1;".to_string());
        }

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    /// Render the change set as pretty-printed JSON
    pub fn render_json(&self, changes: &ChangeSet) -> Result<String> {
        let document = ScriptDocument {
            generated_at: self.config.header.then(Utc::now),
            changes,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Render and write to a file
    pub fn write_to(&self, changes: &ChangeSet, path: impl AsRef<Path>) -> Result<()> {
        let rendered = self.render(changes)?;
        let mut file = File::create(path.as_ref())?;
        file.write_all(rendered.as_bytes())?;
        tracing::info!(path = %path.as_ref().display(), "Wrote migration script");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn changes() -> ChangeSet {
        ChangeSet {
            rename_tables: vec!["RENAME TABLE `clients` TO `customers`;".to_string()],
            alter_tables: vec!["ALTER TABLE `orders` ADD COLUMN `total` decimal(10,2) NOT NULL DEFAULT 0;".to_string()],
            warnings: vec!["table x might have unmet dependencies on: y".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_sql_sections() {
        let config = OutputConfig {
            header: false,
            disable_foreign_key_checks: true,
            ..Default::default()
        };
        let script = ScriptGenerator::new(&config).render_sql(&changes());
        assert_eq!(
            script,
            "-- WARNING: table x might have unmet dependencies on: y
SET FOREIGN_KEY_CHECKS=0;
-- renameTables
RENAME TABLE `clients` TO `customers`;
-- alterTables
ALTER TABLE `orders` ADD COLUMN `total` decimal(10,2) NOT NULL DEFAULT 0;
SET FOREIGN_KEY_CHECKS=1;
"
        );
    }

    #[test]
    fn test_render_sql_header() {
        let config = OutputConfig::default();
        let script = ScriptGenerator::new(&config).render_sql(&ChangeSet::default());
        assert!(script.starts_with("-- schema_diff migration script\n-- Generated: "));
        assert!(!script.contains("FOREIGN_KEY_CHECKS"));
    }

    #[test]
    fn test_render_json() {
        let config = OutputConfig {
            format: OutputFormat::Json,
            header: false,
            ..Default::default()
        };
        let rendered = ScriptGenerator::new(&config).render(&changes()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(value.get("generated_at").is_none());
        assert_eq!(value["renameTables"][0], "RENAME TABLE `clients` TO `customers`;");
        assert_eq!(value["createTables"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration.sql");
        let config = OutputConfig {
            header: false,
            ..Default::default()
        };
        ScriptGenerator::new(&config).write_to(&changes(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("-- alterTables\nALTER TABLE `orders`"));
    }
}
