pub mod error;
pub mod postgres;
pub mod sql;
pub mod sqlite;
pub mod traits;

pub use error::*;
pub use postgres::*;
pub use sqlite::*;
pub use traits::*;

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::DatabaseConfig;

/// Build the record store named by `config.driver`
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.driver.as_str() {
        "postgres" => Arc::new(PostgresStore::connect(config).await?),
        "sqlite" | "sqlite3" => Arc::new(SqliteStore::connect(config).await?),
        other => bail!("Store driver not supported: {}", other),
    };

    Ok(store)
}
