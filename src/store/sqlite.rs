use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::store::sql::{impl_sql_record_store, SqlStatements};

pub const IN_MEMORY_URI: &str = "sqlite::memory:";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    statements: SqlStatements,
    uri: String,
}

impl SqliteStore {
    /// Open (or create) a SQLite database. Without a connection string the
    /// store lives in memory for the lifetime of the process.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let statements = SqlStatements::new(&config.table)?;
        let uri = config
            .connection_string()
            .unwrap_or_else(|| IN_MEMORY_URI.to_string());

        let options = SqliteConnectOptions::from_str(&uri)
            .with_context(|| format!("Invalid SQLite connection string {}", uri))?
            .create_if_missing(true);

        // Each connection to an in-memory database sees its own private
        // database, so the pool must hold exactly one that never expires.
        let pool_options = if is_in_memory(&uri) {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.unwrap_or(20))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        let store = Self {
            pool,
            statements,
            uri,
        };

        if let Some(dir) = config.migrations_dir() {
            store.migrate(&dir).await?;
        }

        Ok(store)
    }

    /// Run database migrations from `dir`
    pub async fn migrate(&self, dir: &Path) -> Result<()> {
        sqlx::migrate::Migrator::new(dir)
            .await
            .with_context(|| format!("Failed to read migrations from {}", dir.display()))?
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn describe(&self) -> String {
        format!("sqlite ({}, table {})", self.uri, self.statements.table)
    }
}

fn is_in_memory(uri: &str) -> bool {
    uri.contains(":memory:") || uri.contains("mode=memory")
}

impl_sql_record_store!(SqliteStore);
