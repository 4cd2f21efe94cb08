use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::{Id, Record};
use crate::store::StoreError;

/// The only accepted value of `Payment::payment_type`. It is implied by the
/// resource and never persisted.
pub const PAYMENT_TYPE: &str = "Payment";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("payment id is empty")]
    EmptyId,
    #[error("invalid payment type {0:?}")]
    InvalidType(String),
    #[error("payment organisation is empty")]
    EmptyOrganisation,
    #[error("invalid payment amount {0:?}")]
    InvalidAmount(String),
    #[error("payment amount must be positive, got {0}")]
    NonPositiveAmount(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentAttributes {
    /// Decimal amount encoded as a string, e.g. "100.21"
    pub amount: String,
    /// Any further attributes are stored and returned untouched
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl PaymentAttributes {
    pub fn with_amount(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            other: serde_json::Map::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = match decimal_amount(&self.amount) {
            Some(amount) if !amount.is_zero() => amount > Decimal::ZERO,
            // Beyond 96 bits or 28 places, or rounded down to zero
            _ => {
                let amount = f64::from_str(&self.amount)
                    .ok()
                    .filter(|amount| amount.is_finite())
                    .ok_or_else(|| ValidationError::InvalidAmount(self.amount.clone()))?;
                amount > 0.0
            }
        };

        if !positive {
            return Err(ValidationError::NonPositiveAmount(self.amount.clone()));
        }

        Ok(())
    }
}

fn decimal_amount(amount: &str) -> Option<Decimal> {
    Decimal::from_str(amount)
        .or_else(|_| Decimal::from_scientific(amount))
        .ok()
}

/// Wire representation of a payment.
///
/// Every field defaults when missing from the JSON document, so an incomplete
/// payment is reported by `validate` rather than by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub id: Id,
    #[serde(rename = "type")]
    pub payment_type: String,
    pub version: i64,
    #[serde(rename = "organisation_id")]
    pub organisation: String,
    pub attributes: PaymentAttributes,
}

impl Payment {
    pub fn new(id: impl Into<Id>, organisation: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payment_type: PAYMENT_TYPE.to_string(),
            version: 0,
            organisation: organisation.into(),
            attributes: PaymentAttributes::with_amount(amount),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }

        if self.payment_type != PAYMENT_TYPE {
            return Err(ValidationError::InvalidType(self.payment_type.clone()));
        }

        if self.organisation.trim().is_empty() {
            return Err(ValidationError::EmptyOrganisation);
        }

        self.attributes.validate()
    }

    pub fn to_record(&self) -> Result<Record, StoreError> {
        let attributes =
            serde_json::to_string(&self.attributes).map_err(|source| StoreError::Corrupt {
                id: self.id.clone(),
                source,
            })?;

        Ok(Record {
            id: self.id.clone(),
            version: self.version,
            organisation: self.organisation.clone(),
            attributes,
        })
    }

    pub fn from_record(record: &Record) -> Result<Self, StoreError> {
        let attributes = if record.attributes.is_empty() {
            PaymentAttributes::default()
        } else {
            serde_json::from_str(&record.attributes).map_err(|source| StoreError::Corrupt {
                id: record.id.clone(),
                source,
            })?
        };

        Ok(Self {
            id: record.id.clone(),
            payment_type: PAYMENT_TYPE.to_string(),
            version: record.version,
            organisation: record.organisation.clone(),
            attributes,
        })
    }

    pub fn from_records(records: &[Record]) -> Result<Vec<Self>, StoreError> {
        records.iter().map(Self::from_record).collect()
    }
}
