use tracing::{debug, warn};

use campusledger_core::{DocId, DomainError, DomainResult};
use campusledger_store::{DocumentStore, StoreError};

/// Collection holding one counter document per partition key.
pub const REGISTRATION_COUNTERS: &str = "registration-counters";

/// Counter field on the partition document.
const LAST_NUMBER: &str = "last_number";

/// Attempts against the store's atomic increment before giving up.
const MAX_ATTEMPTS: u32 = 5;

/// Issues unique, ordered registration numbers scoped by a partition key
/// (typically a calendar year).
///
/// All mutation goes through the store's transactional increment; the counter
/// document is the single source of truth for its partition. Gaps are
/// permitted (a failed caller after a successful increment simply burns a
/// number); duplicates never are.
#[derive(Debug)]
pub struct SequenceAllocator<S> {
    store: S,
    prefix: String,
}

impl<S: DocumentStore> SequenceAllocator<S> {
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Allocate the next number in `partition_key`.
    ///
    /// Creates the counter atomically at zero on first use. Contention from
    /// the store is retried up to [`MAX_ATTEMPTS`] times before escalating to
    /// [`DomainError::AllocationContention`], which the caller may retry with
    /// backoff.
    pub fn allocate(&self, partition_key: &str) -> DomainResult<i64> {
        let counter_id = DocId::new(partition_key)
            .map_err(|_| DomainError::validation("partition key must not be empty"))?;

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.store.increment(REGISTRATION_COUNTERS, &counter_id, LAST_NUMBER) {
                Ok(n) => {
                    debug!(partition = partition_key, number = n, "allocated sequence number");
                    return Ok(n);
                }
                Err(StoreError::Contention(detail)) => {
                    warn!(partition = partition_key, attempt, "increment contention, retrying");
                    last_err = Some(detail);
                }
                Err(other) => return Err(DomainError::commit_failed(other.to_string())),
            }
        }

        Err(DomainError::contention(format!(
            "partition {partition_key}: {MAX_ATTEMPTS} attempts exhausted ({})",
            last_err.unwrap_or_default()
        )))
    }

    /// Allocate and format a registration number:
    /// `<PREFIX><partitionKey><n zero-padded to 4>`, e.g. `UCAES20250001`.
    pub fn allocate_formatted(&self, partition_key: &str) -> DomainResult<String> {
        let n = self.allocate(partition_key)?;
        Ok(format!("{}{partition_key}{n:04}", self.prefix))
    }
}
