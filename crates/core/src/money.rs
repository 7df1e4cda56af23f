//! Monetary value object.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An amount of money in the smallest currency unit (e.g. pesewas, cents).
///
/// Integer minor units only; float arithmetic never touches financial values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units. Non-negative for every value this engine posts.
    pub amount: i64,
    /// ISO 4217 currency code, e.g. "GHS".
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Result<Self, DomainError> {
        let currency = currency.into();
        if amount < 0 {
            return Err(DomainError::validation("amount must be non-negative"));
        }
        if currency.is_empty() {
            return Err(DomainError::validation("currency must not be empty"));
        }
        Ok(Self { amount, currency })
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
