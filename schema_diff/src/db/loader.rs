//! Building [`Database`] models from a schema source

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LoadMode;
use crate::db::source::SchemaSource;
use crate::error::{Error, Result};
use crate::schema::{Database, Table};

/// How a schema is turned into a [`Database`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub mode: LoadMode,
    /// Build the foreign key graph after loading
    pub link: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mode: LoadMode::Statements,
            link: true,
        }
    }
}

/// Load every table of `schema` into a new [`Database`]
///
/// Definitions are fetched concurrently; the model is built afterwards.
pub async fn load_database<S>(source: &S, schema: &str, options: LoadOptions) -> Result<Database>
where
    S: SchemaSource + ?Sized,
{
    let mut database = match source.fetch_create_database(schema).await {
        Ok(stmt) => Database::parse(&stmt)?,
        Err(Error::NotFound(_)) => Database::new(schema),
        Err(e) => return Err(e),
    };

    let names = source.list_tables(schema).await?;
    let tables: Vec<Table> = match options.mode {
        LoadMode::Statements => {
            let statements = try_join_all(
                names
                    .iter()
                    .map(|name| source.fetch_create_statement(schema, name)),
            )
            .await?;
            statements
                .iter()
                .map(|stmt| Table::parse(stmt))
                .collect::<Result<_>>()?
        }
        LoadMode::Columns => {
            let columns = try_join_all(names.iter().map(|name| source.fetch_columns(schema, name))).await?;
            names
                .iter()
                .zip(columns.iter())
                .map(|(name, columns)| Table::from_columns(name, columns))
                .collect::<Result<_>>()?
        }
    };

    for table in tables {
        database.add_table(table, false)?;
    }
    if options.link {
        database.link_tables()?;
    }

    info!(schema, tables = database.len(), mode = ?options.mode, "Loaded schema");
    Ok(database)
}
