use crate::model::Id;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the record store.
///
/// `NotFound` and `Conflict` are the two outcomes callers are expected to
/// branch on; everything else is an internal failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {id} not found")]
    NotFound { id: Id },

    #[error("conflicting write on record {id}")]
    Conflict { id: Id },

    #[error("record {id} could not be (de)serialized: {source}")]
    Corrupt {
        id: Id,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} on record {id} affected {affected} rows")]
    Invariant {
        operation: &'static str,
        id: Id,
        affected: u64,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn conflict(id: &str) -> Self {
        Self::Conflict { id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
