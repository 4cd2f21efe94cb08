use serde::{Deserialize, Serialize};

pub type Id = String;

/// A versioned row of the record store.
///
/// `attributes` is opaque to the store; the payment model decides what it holds.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Record {
    pub id: Id,
    pub version: i64,
    pub organisation: String,
    pub attributes: String,
}

impl Record {
    pub fn new(id: impl Into<Id>, organisation: impl Into<String>, attributes: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            organisation: organisation.into(),
            attributes: attributes.into(),
        }
    }

    /// Copy of this record carrying a different version
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub count: i64,
}
