use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use campusledger_core::DocId;

use crate::batch::WriteBatch;
use crate::document::Document;

/// Store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, bundle limits)
/// as opposed to domain errors (validation, lifecycle rules). The posting
/// layer maps them into the caller-facing taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write's optimistic precondition did not hold at commit time. The
    /// whole bundle was rejected; nothing was applied.
    #[error("precondition failed on {collection}/{id}: {detail}")]
    PreconditionFailed {
        collection: String,
        id: DocId,
        detail: String,
    },

    /// The bundle exceeds the store's per-commit write cap.
    #[error("batch of {size} writes exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// The atomic increment lost too many races. Retryable.
    #[error("counter contention: {0}")]
    Contention(String),

    /// The store could not be reached or rejected the request outright.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A payload could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A write was malformed (non-object payload, duplicate create, ...).
    #[error("invalid write: {0}")]
    InvalidWrite(String),
}

impl StoreError {
    pub fn is_precondition_failure(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}

/// Document store contract.
///
/// ## Commit semantics
///
/// `commit()` applies a [`WriteBatch`] atomically: every precondition is
/// checked against current state and every write validated *before* anything
/// is applied; on any failure the bundle is rejected whole. There is no
/// isolation *between* bundles — two concurrent commits may interleave in
/// either order, which is exactly why mutating writes carry preconditions.
///
/// ## Increment semantics
///
/// `increment()` is an atomic read-modify-write on a single counter field:
/// create-at-zero when the counter document is absent, then add one and
/// return the new value. Two concurrent callers never observe or receive the
/// same value. A plain get-then-set is a check-then-act race and must never
/// be used in its place.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id. `Ok(None)` when absent.
    fn get(&self, collection: &str, id: &DocId) -> Result<Option<Document>, StoreError>;

    /// Fetch a whole collection in ascending id order.
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Fetch documents whose top-level `field` equals `value`, in id order.
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<Document>, StoreError>;

    /// Atomically apply a bundle. Returns the ids of created documents, in
    /// the order their `Create` writes appeared in the bundle.
    fn commit(&self, batch: WriteBatch) -> Result<Vec<DocId>, StoreError>;

    /// Atomically increment `field` on the counter document `id`, creating it
    /// at zero first when absent. Returns the incremented value.
    fn increment(&self, collection: &str, id: &DocId, field: &str) -> Result<i64, StoreError>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn get(&self, collection: &str, id: &DocId) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        (**self).list(collection)
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).find_by_field(collection, field, value)
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<DocId>, StoreError> {
        (**self).commit(batch)
    }

    fn increment(&self, collection: &str, id: &DocId, field: &str) -> Result<i64, StoreError> {
        (**self).increment(collection, id, field)
    }
}
