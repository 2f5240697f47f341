//! schema_diff: compares two MySQL schemas and generates the DDL that migrates one into the other
//!
//! Both schemas are loaded into an in-memory [`Database`] model built from
//! `SHOW CREATE TABLE` output. The comparison detects renamed tables, orders
//! new tables by their foreign key dependencies and produces per-table
//! `ALTER TABLE` statements.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use db::source::{MySqlSource, SchemaSource, StaticSource};
pub use error::{Error, Result};
pub use schema::compare::CompareEngine;
pub use schema::database::Database;
pub use schema::diff::ChangeSet;
pub use schema::generator::ScriptGenerator;
pub use schema::table::Table;

use db::loader::{load_database, LoadOptions};

/// Connect using the specified configuration file
pub async fn init(config_path: &str) -> Result<SchemaDiffClient> {
    let config = config::load_from_file(config_path)?;
    SchemaDiffClient::new(config).await
}

/// The main client: loads the configured base and target schemas and diffs them
pub struct SchemaDiffClient {
    config: Config,
    source: Box<dyn SchemaSource>,
}

impl SchemaDiffClient {
    /// Create a client reading from the configured MySQL server
    pub async fn new(config: Config) -> Result<Self> {
        let connection = DatabaseConnection::connect(&config.database).await?;
        Ok(Self::with_source(config, Box::new(MySqlSource::new(connection))))
    }

    /// Create a client over any schema source
    pub fn with_source(config: Config, source: Box<dyn SchemaSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            mode: self.config.compare.load_mode,
            link: true,
        }
    }

    async fn load(&self, schema: Option<&str>, key: &str) -> Result<Database> {
        let schema = schema.ok_or_else(|| Error::ConfigError(format!("database.{} is not set", key)))?;
        load_database(self.source.as_ref(), schema, self.load_options()).await
    }

    /// Load the schema that needs to change
    pub async fn load_base(&self) -> Result<Database> {
        self.load(self.config.database.base.as_deref(), "base").await
    }

    /// Load the schema to migrate towards
    pub async fn load_target(&self) -> Result<Database> {
        self.load(self.config.database.target.as_deref(), "target").await
    }

    /// Load both schemas and compute the change set
    pub async fn compare(&self) -> Result<ChangeSet> {
        let (mut base, target) = futures::try_join!(self.load_base(), self.load_target())?;
        CompareEngine::new(self.config.compare.clone()).compare(&mut base, &target)
    }

    /// Render a change set in the configured output format
    pub fn generate_script(&self, changes: &ChangeSet) -> Result<String> {
        ScriptGenerator::new(&self.config.output).render(changes)
    }

    /// Complete workflow: load, compare and render
    pub async fn diff(&self) -> Result<String> {
        if !self.config.compare.has_work() {
            tracing::warn!("Nothing to process: enable create, alter or drop");
            return Ok(String::new());
        }
        let changes = self.compare().await?;
        if changes.is_empty() {
            tracing::info!("Schemas are already in sync");
        }
        self.generate_script(&changes)
    }
}
