use anyhow::{bail, Result};

use crate::store::error::{StoreError, StoreResult};

/// Parameterized statements shared by the SQL drivers, rendered once for the
/// configured table.
///
/// Placeholders are `$N` and appear in ascending order so that both Postgres
/// and SQLite bind them positionally. `deleted` is stored as 0/1.
#[derive(Debug, Clone)]
pub struct SqlStatements {
    pub table: String,
    pub count: String,
    pub delete_all: String,
    pub list: String,
    pub fetch: String,
    pub create: String,
    pub update: String,
    pub delete_one: String,
}

impl SqlStatements {
    pub fn new(table: &str) -> Result<Self> {
        validate_table_name(table)?;

        Ok(Self {
            table: table.to_string(),
            count: format!("SELECT COUNT(*) FROM {table} WHERE deleted = 0"),
            delete_all: format!("DELETE FROM {table}"),
            list: format!(
                "SELECT id, version, organisation, attributes FROM {table} \
                 WHERE deleted = 0 ORDER BY id LIMIT $1 OFFSET $2"
            ),
            fetch: format!(
                "SELECT id, version, organisation, attributes FROM {table} \
                 WHERE id = $1 AND deleted = 0"
            ),
            create: format!(
                "INSERT INTO {table} (id, version, organisation, attributes, deleted) \
                 VALUES ($1, 0, $2, $3, 0)"
            ),
            update: format!(
                "UPDATE {table} SET attributes = $1, version = $2 \
                 WHERE id = $3 AND version = $4 AND deleted = 0"
            ),
            delete_one: format!(
                "UPDATE {table} SET deleted = 1 \
                 WHERE id = $1 AND version = $2 AND deleted = 0"
            ),
        })
    }
}

/// Table names are interpolated into SQL, so only plain identifiers with an
/// optional schema qualifier are accepted.
fn validate_table_name(table: &str) -> Result<()> {
    if table.is_empty() {
        bail!("no table defined for the record store");
    }

    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_identifier(part)) {
        bail!("invalid table name {:?}", table);
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Map an insert failure: a duplicate primary key is a conflict, anything
/// else stays a database error.
pub fn classify_create_error(id: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::conflict(id)
    } else {
        StoreError::Database(err)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                || db_err
                    .message()
                    .to_lowercase()
                    .contains("unique constraint")
        }
        _ => false,
    }
}

/// Outcome of a conditional single-row statement. Zero rows means the
/// precondition did not hold and is reported as `on_miss`.
pub fn expect_single_row(
    operation: &'static str,
    id: &str,
    affected: u64,
    on_miss: StoreError,
) -> StoreResult<()> {
    match affected {
        0 => Err(on_miss),
        1 => Ok(()),
        affected => Err(StoreError::Invariant {
            operation,
            id: id.to_string(),
            affected,
        }),
    }
}

/// Version a successful update moves a record to. No stored row can sit at
/// `i64::MAX`, so a request carrying it can only be stale.
pub fn next_version(id: &str, version: i64) -> StoreResult<i64> {
    version
        .checked_add(1)
        .ok_or_else(|| StoreError::conflict(id))
}

/// Implements `RecordStore` for a driver struct holding a sqlx `pool` and its
/// `statements`. The driver supplies `describe()` for the description.
macro_rules! impl_sql_record_store {
    ($store:ty) => {
        #[async_trait::async_trait]
        impl $crate::store::traits::RecordStore for $store {
            fn description(&self) -> String {
                self.describe()
            }

            async fn check(&self) -> $crate::store::error::StoreResult<()> {
                sqlx::query("SELECT 1").execute(&self.pool).await?;
                Ok(())
            }

            async fn close(&self) {
                self.pool.close().await;
            }

            async fn list(
                &self,
                offset: i64,
                limit: i64,
            ) -> $crate::store::error::StoreResult<Vec<$crate::model::Record>> {
                let records = sqlx::query_as::<_, $crate::model::Record>(&self.statements.list)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;

                Ok(records)
            }

            async fn fetch(
                &self,
                id: &str,
            ) -> $crate::store::error::StoreResult<$crate::model::Record> {
                sqlx::query_as::<_, $crate::model::Record>(&self.statements.fetch)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| $crate::store::error::StoreError::not_found(id))
            }

            async fn create(
                &self,
                record: $crate::model::Record,
            ) -> $crate::store::error::StoreResult<$crate::model::Record> {
                sqlx::query(&self.statements.create)
                    .bind(&record.id)
                    .bind(&record.organisation)
                    .bind(&record.attributes)
                    .execute(&self.pool)
                    .await
                    .map_err(|err| $crate::store::sql::classify_create_error(&record.id, err))?;

                Ok(record.with_version(0))
            }

            async fn update(
                &self,
                record: $crate::model::Record,
            ) -> $crate::store::error::StoreResult<$crate::model::Record> {
                let next_version = $crate::store::sql::next_version(&record.id, record.version)?;
                let result = sqlx::query(&self.statements.update)
                    .bind(&record.attributes)
                    .bind(next_version)
                    .bind(&record.id)
                    .bind(record.version)
                    .execute(&self.pool)
                    .await?;

                $crate::store::sql::expect_single_row(
                    "update",
                    &record.id,
                    result.rows_affected(),
                    $crate::store::error::StoreError::conflict(&record.id),
                )?;

                Ok(record.with_version(next_version))
            }

            async fn delete(&self, id: &str, version: i64) -> $crate::store::error::StoreResult<()> {
                let result = sqlx::query(&self.statements.delete_one)
                    .bind(id)
                    .bind(version)
                    .execute(&self.pool)
                    .await?;

                $crate::store::sql::expect_single_row(
                    "delete",
                    id,
                    result.rows_affected(),
                    $crate::store::error::StoreError::not_found(id),
                )
            }

            async fn delete_all(&self) -> $crate::store::error::StoreResult<()> {
                sqlx::query(&self.statements.delete_all)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }

            async fn count(&self) -> $crate::store::error::StoreResult<i64> {
                let count = sqlx::query_scalar::<_, i64>(&self.statements.count)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(count)
            }
        }
    };
}

pub(crate) use impl_sql_record_store;
