//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records, contention surfaced to callers). Infrastructure concerns
/// belong to the store layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input). Rejected before any
    /// write; fully recoverable by correcting the input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record is absent. Terminal for the call.
    #[error("not found: {0}")]
    NotFound(String),

    /// The atomic counter increment could not be applied after bounded
    /// retries. The whole allocation may be retried.
    #[error("sequence allocation contention: {0}")]
    AllocationContention(String),

    /// An atomic write bundle could not be applied. Safe to retry: every
    /// sub-operation re-checks its precondition before acting.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// No active academic year is configured. A configuration gap, not a bug.
    #[error("no active academic year is set")]
    AcademicPeriodUnset,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn contention(msg: impl Into<String>) -> Self {
        Self::AllocationContention(msg.into())
    }

    pub fn commit_failed(msg: impl Into<String>) -> Self {
        Self::CommitFailed(msg.into())
    }

    /// Whether re-invoking the failed operation with the same input is safe.
    ///
    /// Mutating operations guard every write with an idempotent precondition,
    /// so contention and commit failures are always retry-safe. Validation
    /// failures require corrected input; a missing record will still be
    /// missing.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            Self::AllocationContention(_) | Self::CommitFailed(_) => true,
            Self::Validation(_) | Self::NotFound(_) | Self::AcademicPeriodUnset => false,
        }
    }
}
