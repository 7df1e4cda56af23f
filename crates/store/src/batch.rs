use serde_json::Value as JsonValue;

use campusledger_core::DocId;

use crate::document::Document;

/// Hard cap on writes per atomic bundle, imposed by the underlying store.
///
/// Callers spanning more writes than this must chunk into multiple bundles;
/// each chunk is independently atomic, and cross-chunk atomicity is NOT
/// guaranteed.
pub const MAX_WRITES_PER_BATCH: usize = 500;

/// Optimistic precondition attached to a single write.
///
/// Checked against the document's state at commit time, not at queue time; a
/// failed precondition fails the whole bundle. This is what turns a
/// read-then-write sequence into a safe "apply X only if P still holds".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Apply unconditionally.
    None,
    /// The document must exist.
    Exists,
    /// The document must exist and its top-level `field` must equal `value`.
    FieldEquals { field: String, value: JsonValue },
}

impl Precondition {
    pub fn field_equals(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluate against the current document state (`None` = absent).
    pub fn holds(&self, doc: Option<&Document>) -> bool {
        match self {
            Precondition::None => true,
            Precondition::Exists => doc.is_some(),
            Precondition::FieldEquals { field, value } => {
                doc.and_then(|d| d.field(field)) == Some(value)
            }
        }
    }
}

/// A single write queued into a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Create a new document. With `id: None` the store assigns one.
    /// Creating over an existing id fails the bundle.
    Create {
        collection: String,
        id: Option<DocId>,
        data: JsonValue,
    },
    /// Shallow-merge `patch` into an existing document's payload.
    Update {
        collection: String,
        id: DocId,
        patch: JsonValue,
        precondition: Precondition,
    },
    /// Delete a document.
    Delete {
        collection: String,
        id: DocId,
        precondition: Precondition,
    },
}

impl Write {
    pub fn create(collection: impl Into<String>, data: JsonValue) -> Self {
        Self::Create {
            collection: collection.into(),
            id: None,
            data,
        }
    }

    pub fn create_with_id(collection: impl Into<String>, id: DocId, data: JsonValue) -> Self {
        Self::Create {
            collection: collection.into(),
            id: Some(id),
            data,
        }
    }

    pub fn update(
        collection: impl Into<String>,
        id: DocId,
        patch: JsonValue,
        precondition: Precondition,
    ) -> Self {
        Self::Update {
            collection: collection.into(),
            id,
            patch,
            precondition,
        }
    }

    pub fn delete(collection: impl Into<String>, id: DocId, precondition: Precondition) -> Self {
        Self::Delete {
            collection: collection.into(),
            id,
            precondition,
        }
    }
}

/// An ordered set of writes submitted together: either all apply or none do,
/// without intermediate visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: JsonValue) -> Document {
        Document {
            id: DocId::new(id).unwrap(),
            revision: 1,
            data,
        }
    }

    #[test]
    fn field_equals_holds_only_on_matching_value() {
        let d = doc("p1", json!({"status": "approved"}));
        let pre = Precondition::field_equals("status", "approved");
        assert!(pre.holds(Some(&d)));

        let pre = Precondition::field_equals("status", "pending");
        assert!(!pre.holds(Some(&d)));
    }

    #[test]
    fn field_equals_fails_on_absent_document_or_field() {
        let pre = Precondition::field_equals("status", "approved");
        assert!(!pre.holds(None));

        let d = doc("p1", json!({"amount": 10}));
        assert!(!pre.holds(Some(&d)));
    }

    #[test]
    fn exists_requires_a_document() {
        assert!(!Precondition::Exists.holds(None));
        assert!(Precondition::Exists.holds(Some(&doc("p1", json!({})))));
    }
}
