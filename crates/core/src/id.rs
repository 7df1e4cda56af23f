//! Strongly-typed identifiers used across the domain.
//!
//! Document identifiers are assigned by the store as strings, so these are
//! string newtypes rather than UUIDs; the wrappers exist to keep a staff id
//! from being passed where a student id is expected.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a stored document (store-assigned).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

/// Identifier of a staff member (payroll subject).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(String);

/// Identifier of a student (scholarship/wallet subject).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

/// Identity of the acting user (approver, payer). Supplied by the caller's
/// authentication layer, which is outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.is_empty() {
                    return Err(DomainError::validation(concat!($name, " must not be empty")));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_string_newtype!(DocId, "DocId");
impl_string_newtype!(StaffId, "StaffId");
impl_string_newtype!(StudentId, "StudentId");
impl_string_newtype!(UserId, "UserId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_rejected() {
        assert!(DocId::new("").is_err());
        assert!(UserId::new("dir1").is_ok());
    }

    #[test]
    fn doc_ids_order_lexicographically() {
        let a = DocId::new("tx-0001").unwrap();
        let b = DocId::new("tx-0002").unwrap();
        assert!(a < b);
    }
}
