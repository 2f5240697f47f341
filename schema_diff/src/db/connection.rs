//! Database connection handling
//!
//! This module establishes the MySQL connection pool used for schema introspection.

use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// A MySQL connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: MySqlPool,
}

impl DatabaseConnection {
    /// Create a new connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::ConfigError("database.url is not set".to_string()))?;
        if !url.starts_with("mysql://") && !url.starts_with("mariadb://") {
            return Err(Error::DatabaseError(format!(
                "Unsupported database url: {}",
                url
            )));
        }

        let pool_size = config.pool_size.unwrap_or(5);
        let timeout_seconds = config.timeout_seconds.unwrap_or(30);

        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(timeout_seconds))
            .connect(url)
            .await?;

        tracing::debug!(pool_size, "Connected to database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url() {
        let config = DatabaseConfig::default();
        let err = DatabaseConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_unsupported_url() {
        let config = DatabaseConfig {
            url: Some("postgres://localhost/shop".to_string()),
            ..Default::default()
        };
        let err = DatabaseConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseError(_)));
    }
}
