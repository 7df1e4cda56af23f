use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value as JsonValue, json};
use tracing::debug;
use uuid::Uuid;

use campusledger_core::DocId;

use crate::batch::{MAX_WRITES_PER_BATCH, Write, WriteBatch};
use crate::document::Document;
use crate::store::{DocumentStore, StoreError};

/// In-memory document store.
///
/// Intended for tests/dev. Collections are `BTreeMap`s keyed by id, so
/// `list()` order is ascending id order; store-assigned ids are time-ordered
/// UUIDv7 strings, so id order is creation order.
///
/// Fault injection: `fail_next_commits` / `fail_next_increments` make the
/// next *n* calls fail before touching any state, for exercising
/// all-or-nothing and contention paths.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    failing_commits: AtomicUsize,
    failing_increments: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commits fail with `Unavailable` before applying
    /// anything.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` increments fail with `Contention`.
    pub fn fail_next_increments(&self, n: usize) {
        self.failing_increments.store(n, Ordering::SeqCst);
    }

    fn take_injected_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn assign_id() -> DocId {
        // UUIDv7 is time-ordered; lexicographic id order tracks creation order.
        DocId::new(Uuid::now_v7().to_string()).unwrap_or_else(|_| unreachable!())
    }

    fn shallow_merge(data: &mut JsonValue, patch: &JsonValue) -> Result<(), StoreError> {
        let (JsonValue::Object(target), JsonValue::Object(fields)) = (data, patch) else {
            return Err(StoreError::InvalidWrite(
                "update patch must be a JSON object".to_string(),
            ));
        };
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: &str, id: &DocId) -> Result<Option<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id.as_str()))
            .cloned())
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .list(collection)?
            .into_iter()
            .filter(|d| d.field(field) == Some(value))
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<Vec<DocId>, StoreError> {
        let size = batch.len();
        if size > MAX_WRITES_PER_BATCH {
            return Err(StoreError::BatchTooLarge {
                size,
                max: MAX_WRITES_PER_BATCH,
            });
        }
        if batch.is_empty() {
            return Ok(vec![]);
        }
        if Self::take_injected_failure(&self.failing_commits) {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Phase 1: validate every write against pre-bundle state. Nothing is
        // applied until the whole bundle has passed.
        let mut pending_creates: Vec<(String, DocId)> = Vec::new();
        for write in batch.writes() {
            match write {
                Write::Create {
                    collection,
                    id,
                    data,
                } => {
                    if !data.is_object() {
                        return Err(StoreError::InvalidWrite(
                            "document payload must be a JSON object".to_string(),
                        ));
                    }
                    let id = match id {
                        Some(id) => id.clone(),
                        None => Self::assign_id(),
                    };
                    let exists = collections
                        .get(collection)
                        .is_some_and(|c| c.contains_key(id.as_str()))
                        || pending_creates
                            .iter()
                            .any(|(c, i)| c == collection && i == &id);
                    if exists {
                        return Err(StoreError::PreconditionFailed {
                            collection: collection.clone(),
                            id,
                            detail: "document already exists".to_string(),
                        });
                    }
                    pending_creates.push((collection.clone(), id));
                }
                Write::Update {
                    collection,
                    id,
                    patch,
                    precondition,
                } => {
                    if !patch.is_object() {
                        return Err(StoreError::InvalidWrite(
                            "update patch must be a JSON object".to_string(),
                        ));
                    }
                    let current = collections.get(collection).and_then(|c| c.get(id.as_str()));
                    if current.is_none() {
                        return Err(StoreError::PreconditionFailed {
                            collection: collection.clone(),
                            id: id.clone(),
                            detail: "document does not exist".to_string(),
                        });
                    }
                    if !precondition.holds(current) {
                        return Err(StoreError::PreconditionFailed {
                            collection: collection.clone(),
                            id: id.clone(),
                            detail: format!("{precondition:?} does not hold"),
                        });
                    }
                }
                Write::Delete {
                    collection,
                    id,
                    precondition,
                } => {
                    let current = collections.get(collection).and_then(|c| c.get(id.as_str()));
                    if !precondition.holds(current) {
                        return Err(StoreError::PreconditionFailed {
                            collection: collection.clone(),
                            id: id.clone(),
                            detail: format!("{precondition:?} does not hold"),
                        });
                    }
                }
            }
        }

        // Phase 2: apply. Cannot fail past this point.
        let mut created = Vec::new();
        let mut assigned = pending_creates.into_iter();
        for write in batch.into_writes() {
            match write {
                Write::Create {
                    collection, data, ..
                } => {
                    // Ids were resolved during validation, in the same order.
                    let (_, id) = assigned.next().unwrap_or_else(|| unreachable!());
                    let entry = collections.entry(collection).or_default();
                    entry.insert(
                        id.as_str().to_string(),
                        Document {
                            id: id.clone(),
                            revision: 1,
                            data,
                        },
                    );
                    created.push(id);
                }
                Write::Update {
                    collection,
                    id,
                    patch,
                    ..
                } => {
                    let doc = collections
                        .get_mut(&collection)
                        .and_then(|c| c.get_mut(id.as_str()))
                        .unwrap_or_else(|| unreachable!());
                    Self::shallow_merge(&mut doc.data, &patch)?;
                    doc.revision += 1;
                }
                Write::Delete { collection, id, .. } => {
                    if let Some(c) = collections.get_mut(&collection) {
                        c.remove(id.as_str());
                    }
                }
            }
        }

        debug!(writes = size, created = created.len(), "bundle committed");
        Ok(created)
    }

    fn increment(&self, collection: &str, id: &DocId, field: &str) -> Result<i64, StoreError> {
        if Self::take_injected_failure(&self.failing_increments) {
            return Err(StoreError::Contention(
                "injected increment conflict".to_string(),
            ));
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let entry = collections.entry(collection.to_string()).or_default();
        let doc = entry
            .entry(id.as_str().to_string())
            .or_insert_with(|| Document {
                id: id.clone(),
                revision: 0,
                data: json!({ field: 0 }),
            });

        let current = doc.field(field).and_then(JsonValue::as_i64).unwrap_or(0);
        let next = current + 1;
        if let JsonValue::Object(fields) = &mut doc.data {
            fields.insert(field.to_string(), json!(next));
        }
        doc.revision += 1;

        debug!(collection, id = %id, value = next, "counter incremented");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Precondition;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn doc_id(s: &str) -> DocId {
        DocId::new(s).unwrap()
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = InMemoryDocumentStore::new();
        let mut batch = WriteBatch::new();
        batch.push(Write::create("payroll", json!({"status": "pending"})));
        let created = store.commit(batch).unwrap();
        assert_eq!(created.len(), 1);

        let doc = store.get("payroll", &created[0]).unwrap().unwrap();
        assert_eq!(doc.str_field("status"), Some("pending"));
        assert_eq!(doc.revision, 1);
    }

    #[test]
    fn failed_precondition_rejects_the_whole_bundle() {
        let store = InMemoryDocumentStore::new();
        let mut seed = WriteBatch::new();
        seed.push(Write::create_with_id(
            "payroll",
            doc_id("p1"),
            json!({"status": "pending"}),
        ));
        store.commit(seed).unwrap();

        // First write would succeed alone; the second write's precondition
        // fails, so neither may be observed.
        let mut batch = WriteBatch::new();
        batch.push(Write::update(
            "payroll",
            doc_id("p1"),
            json!({"status": "approved"}),
            Precondition::None,
        ));
        batch.push(Write::update(
            "payroll",
            doc_id("p1"),
            json!({"paid": true}),
            Precondition::field_equals("status", "paid"),
        ));

        let err = store.commit(batch).unwrap_err();
        assert!(err.is_precondition_failure());

        let doc = store.get("payroll", &doc_id("p1")).unwrap().unwrap();
        assert_eq!(doc.str_field("status"), Some("pending"));
        assert!(doc.field("paid").is_none());
    }

    #[test]
    fn update_on_missing_document_is_a_precondition_failure() {
        let store = InMemoryDocumentStore::new();
        let mut batch = WriteBatch::new();
        batch.push(Write::update(
            "payroll",
            doc_id("ghost"),
            json!({"status": "approved"}),
            Precondition::None,
        ));
        assert!(store.commit(batch).unwrap_err().is_precondition_failure());
    }

    #[test]
    fn duplicate_create_in_one_bundle_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let mut batch = WriteBatch::new();
        batch.push(Write::create_with_id("payroll", doc_id("p1"), json!({})));
        batch.push(Write::create_with_id("payroll", doc_id("p1"), json!({})));
        assert!(store.commit(batch).unwrap_err().is_precondition_failure());
        assert!(store.get("payroll", &doc_id("p1")).unwrap().is_none());
    }

    #[test]
    fn oversized_batch_is_rejected_before_any_write() {
        let store = InMemoryDocumentStore::new();
        let mut batch = WriteBatch::new();
        for _ in 0..=MAX_WRITES_PER_BATCH {
            batch.push(Write::create("bulk", json!({})));
        }
        match store.commit(batch).unwrap_err() {
            StoreError::BatchTooLarge { size, max } => {
                assert_eq!(size, MAX_WRITES_PER_BATCH + 1);
                assert_eq!(max, MAX_WRITES_PER_BATCH);
            }
            other => panic!("expected BatchTooLarge, got {other:?}"),
        }
        assert!(store.list("bulk").unwrap().is_empty());
    }

    #[test]
    fn increment_creates_counter_at_zero_and_counts_up() {
        let store = InMemoryDocumentStore::new();
        let id = doc_id("2025");
        assert_eq!(store.increment("registration-counters", &id, "last_number").unwrap(), 1);
        assert_eq!(store.increment("registration-counters", &id, "last_number").unwrap(), 2);

        let doc = store.get("registration-counters", &id).unwrap().unwrap();
        assert_eq!(doc.field("last_number"), Some(&json!(2)));
    }

    #[test]
    fn concurrent_increments_never_duplicate() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let id = doc_id("2025");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(std::thread::spawn(move || {
                (0..50)
                    .map(|_| store.increment("registration-counters", &id, "last_number").unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8 * 50);
    }

    #[test]
    fn injected_commit_failure_applies_nothing() {
        let store = InMemoryDocumentStore::new();
        store.fail_next_commits(1);

        let mut batch = WriteBatch::new();
        batch.push(Write::create_with_id("payroll", doc_id("p1"), json!({})));
        assert!(matches!(
            store.commit(batch).unwrap_err(),
            StoreError::Unavailable(_)
        ));
        assert!(store.get("payroll", &doc_id("p1")).unwrap().is_none());

        // The failure budget is spent; the retry goes through.
        let mut batch = WriteBatch::new();
        batch.push(Write::create_with_id("payroll", doc_id("p1"), json!({})));
        store.commit(batch).unwrap();
        assert!(store.get("payroll", &doc_id("p1")).unwrap().is_some());
    }

    proptest! {
        /// Property: a guarded bundle applies iff every member's precondition
        /// holds; one stale guard leaves every document untouched.
        #[test]
        fn guarded_bundle_is_all_or_nothing(
            statuses in prop::collection::vec(
                prop::sample::select(vec!["pending", "approved", "paid"]),
                1..12
            )
        ) {
            let store = InMemoryDocumentStore::new();
            for (i, status) in statuses.iter().enumerate() {
                let mut batch = WriteBatch::new();
                batch.push(Write::create_with_id(
                    "payroll",
                    doc_id(&format!("p{i:02}")),
                    json!({ "status": status }),
                ));
                store.commit(batch).unwrap();
            }

            let mut batch = WriteBatch::new();
            for i in 0..statuses.len() {
                batch.push(Write::update(
                    "payroll",
                    doc_id(&format!("p{i:02}")),
                    json!({ "status": "approved" }),
                    Precondition::field_equals("status", "pending"),
                ));
            }

            let all_pending = statuses.iter().all(|s| *s == "pending");
            prop_assert_eq!(store.commit(batch).is_ok(), all_pending);

            for (i, status) in statuses.iter().enumerate() {
                let doc = store
                    .get("payroll", &doc_id(&format!("p{i:02}")))
                    .unwrap()
                    .unwrap();
                let expected = if all_pending { "approved" } else { *status };
                prop_assert_eq!(doc.str_field("status"), Some(expected));
            }
        }
    }

    #[test]
    fn assigned_ids_are_time_ordered() {
        let store = InMemoryDocumentStore::new();
        let mut first = WriteBatch::new();
        first.push(Write::create("wallet-transactions", json!({"n": 1})));
        let a = store.commit(first).unwrap().remove(0);

        let mut second = WriteBatch::new();
        second.push(Write::create("wallet-transactions", json!({"n": 2})));
        let b = store.commit(second).unwrap().remove(0);

        assert!(a < b);
        let listed = store.list("wallet-transactions").unwrap();
        assert_eq!(listed[0].id, a);
        assert_eq!(listed[1].id, b);
    }
}
