use crate::model::{Record, StoreInfo};
use crate::store::error::{StoreError, StoreResult};

/// Versioned storage of opaque records with optimistic concurrency.
///
/// Every mutating operation is a single conditional statement: the database
/// decides which of two concurrent writers on the same `(id, version)` wins.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Driver and location, for startup logs
    fn description(&self) -> String;

    /// Round trip to the database
    async fn check(&self) -> StoreResult<()>;

    /// Release the connection pool
    async fn close(&self);

    /// Up to `limit` live records starting at `offset`, in primary key order
    async fn list(&self, offset: i64, limit: i64) -> StoreResult<Vec<Record>>;

    /// The live record with `id`, `NotFound` if absent or soft-deleted
    async fn fetch(&self, id: &str) -> StoreResult<Record>;

    /// Insert at version 0, `Conflict` if the id already exists
    async fn create(&self, record: Record) -> StoreResult<Record>;

    /// Replace attributes of the live record at `record.version` and bump the
    /// version by one. `Conflict` when no live row matches.
    async fn update(&self, record: Record) -> StoreResult<Record>;

    /// Soft-delete the live record at exactly `version`. `NotFound` when no
    /// live row matches.
    async fn delete(&self, id: &str, version: i64) -> StoreResult<()>;

    /// Physically remove every row, soft-deleted ones included
    async fn delete_all(&self) -> StoreResult<()>;

    /// Number of live records
    async fn count(&self) -> StoreResult<i64>;

    async fn info(&self) -> StoreResult<StoreInfo> {
        Ok(StoreInfo {
            count: self.count().await?,
        })
    }

    fn is_conflict(&self, err: &StoreError) -> bool {
        err.is_conflict()
    }

    fn is_not_found(&self, err: &StoreError) -> bool {
        err.is_not_found()
    }
}
