//! Schema sources
//!
//! A [`SchemaSource`] hands out the raw DDL and column rows a [`Database`]
//! model is built from. [`MySqlSource`] reads a live server, [`StaticSource`]
//! serves statements held in memory or read from a `mysqldump --no-data` file.
//!
//! [`Database`]: crate::schema::Database

use std::path::Path;

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::mysql::MySqlRow;
use sqlx::{ColumnIndex, Row};

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::field::ColumnInfo;
use crate::utils::naming::{first_backticked, quote_identifier};

/// Provider of raw schema definitions
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Names of the base tables of a schema
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// `SHOW CREATE TABLE` output for one table
    async fn fetch_create_statement(&self, schema: &str, table: &str) -> Result<String>;

    /// `SHOW COLUMNS` rows for one table
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>>;

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;

    /// `SHOW CREATE DATABASE` output
    async fn fetch_create_database(&self, schema: &str) -> Result<String>;
}

/// Schema source backed by a MySQL server
#[derive(Debug, Clone)]
pub struct MySqlSource {
    connection: DatabaseConnection,
}

impl MySqlSource {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

/// Read a text column, accepting the binary strings some `SHOW` statements return
fn column_text<I>(row: &MySqlRow, index: I) -> Result<Option<String>>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value);
    }
    let bytes: Option<Vec<u8>> = row.try_get(index)?;
    Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
}

fn required_text<I>(row: &MySqlRow, index: I, what: &str) -> Result<String>
where
    I: ColumnIndex<MySqlRow> + Copy,
{
    column_text(row, index)?.ok_or_else(|| Error::DatabaseError(format!("{} is NULL", what)))
}

#[async_trait]
impl SchemaSource for MySqlSource {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = ?
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(sql)
            .bind(schema)
            .fetch_all(self.connection.pool())
            .await?;

        rows.iter()
            .map(|row| required_text(row, 0, "table_name"))
            .collect()
    }

    async fn fetch_create_statement(&self, schema: &str, table: &str) -> Result<String> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_identifier(schema),
            quote_identifier(table)
        );
        let row = sqlx::query(&sql)
            .fetch_one(self.connection.pool())
            .await?;
        required_text(&row, 1, "Create Table")
    }

    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!(
            "SHOW COLUMNS FROM {} IN {}",
            quote_identifier(table),
            quote_identifier(schema)
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.connection.pool())
            .await?;

        rows.iter()
            .map(|row| -> Result<ColumnInfo> {
                Ok(ColumnInfo {
                    name: required_text(row, 0, "Field")?,
                    column_type: required_text(row, 1, "Type")?,
                    nullable: column_text(row, 2)?.as_deref() == Some("YES"),
                    primary: column_text(row, 3)?.as_deref() == Some("PRI"),
                    default: column_text(row, 4)?,
                    extra: column_text(row, 5)?.filter(|e| !e.is_empty()),
                })
            })
            .collect()
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        let sql = r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema = ? AND table_name = ?
        "#;
        let count: i64 = sqlx::query_scalar(sql)
            .bind(schema)
            .bind(table)
            .fetch_one(self.connection.pool())
            .await?;
        Ok(count > 0)
    }

    async fn fetch_create_database(&self, schema: &str) -> Result<String> {
        let sql = format!("SHOW CREATE DATABASE {}", quote_identifier(schema));
        let row = sqlx::query(&sql)
            .fetch_one(self.connection.pool())
            .await?;
        required_text(&row, 1, "Create Database")
    }
}

/// Statements of one schema held by a [`StaticSource`]
#[derive(Debug, Clone, Default)]
struct StaticSchema {
    create_database: Option<String>,
    tables: IndexMap<String, String>,
    columns: IndexMap<String, Vec<ColumnInfo>>,
}

/// In-memory schema source
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    schemas: IndexMap<String, StaticSchema>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source holding one schema read from `mysqldump --no-data` output
    pub fn from_dump(schema: &str, dump: &str) -> Result<Self> {
        let mut source = Self::new();
        source.add_dump(schema, dump)?;
        Ok(source)
    }

    /// Read a dump file into `schema`
    pub fn add_dump_file(&mut self, schema: &str, path: impl AsRef<Path>) -> Result<usize> {
        let dump = std::fs::read_to_string(path.as_ref())?;
        self.add_dump(schema, &dump)
    }

    /// Register every `CREATE TABLE` of a dump, returning how many were found
    pub fn add_dump(&mut self, schema: &str, dump: &str) -> Result<usize> {
        let mut count = 0;
        let mut current: Vec<&str> = Vec::new();

        for line in dump.lines() {
            let trimmed = line.trim();
            if current.is_empty() {
                if trimmed.starts_with("CREATE TABLE") {
                    current.push(line.trim_end());
                } else if trimmed.starts_with("CREATE DATABASE") {
                    let stmt = trimmed.trim_end_matches(';').to_string();
                    self.schema_mut(schema).create_database = Some(stmt);
                }
                continue;
            }

            current.push(line.trim_end());
            if trimmed.starts_with(')') && trimmed.ends_with(';') {
                let stmt = current.join("\n");
                self.add_table(schema, stmt.trim_end_matches(';'))?;
                current.clear();
                count += 1;
            }
        }

        if let Some(first) = current.first() {
            return Err(Error::parse(*first, current.join("\n")));
        }
        tracing::debug!(schema, tables = count, "Read schema dump");
        Ok(count)
    }

    /// Register a `CREATE TABLE` statement
    pub fn add_table(&mut self, schema: &str, stmt: &str) -> Result<()> {
        let header = stmt.lines().next().unwrap_or_default();
        let name = first_backticked(header).ok_or_else(|| Error::parse(header, stmt))?;
        self.schema_mut(schema)
            .tables
            .insert(name, stmt.trim().to_string());
        Ok(())
    }

    /// Register `SHOW COLUMNS` rows for a table
    pub fn add_columns(&mut self, schema: &str, table: &str, columns: Vec<ColumnInfo>) {
        self.schema_mut(schema)
            .columns
            .insert(table.to_string(), columns);
    }

    pub fn set_create_database(&mut self, schema: &str, stmt: &str) {
        self.schema_mut(schema).create_database = Some(stmt.trim().to_string());
    }

    fn schema_mut(&mut self, schema: &str) -> &mut StaticSchema {
        self.schemas.entry(schema.to_string()).or_default()
    }

    fn schema(&self, schema: &str) -> Result<&StaticSchema> {
        self.schemas
            .get(schema)
            .ok_or_else(|| Error::NotFound(format!("schema {}", schema)))
    }
}

#[async_trait]
impl SchemaSource for StaticSource {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let schema = self.schema(schema)?;
        let mut names: Vec<String> = schema.tables.keys().cloned().collect();
        for table in schema.columns.keys() {
            if !schema.tables.contains_key(table) {
                names.push(table.clone());
            }
        }
        Ok(names)
    }

    async fn fetch_create_statement(&self, schema: &str, table: &str) -> Result<String> {
        self.schema(schema)?
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("table {}.{}", schema, table)))
    }

    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        self.schema(schema)?
            .columns
            .get(table)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("columns of {}.{}", schema, table)))
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        Ok(self.schemas.get(schema).is_some_and(|s| {
            s.tables.contains_key(table) || s.columns.contains_key(table)
        }))
    }

    async fn fetch_create_database(&self, schema: &str) -> Result<String> {
        self.schema(schema)?
            .create_database
            .clone()
            .ok_or_else(|| Error::NotFound(format!("CREATE DATABASE for {}", schema)))
    }
}
