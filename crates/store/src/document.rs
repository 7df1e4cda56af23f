use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use campusledger_core::DocId;

use crate::store::StoreError;

/// A stored document: id, revision, and a JSON object payload.
///
/// `revision` starts at 1 on create and increments on every mutation. It is
/// internal to the store's own bookkeeping; callers express optimistic
/// preconditions over fields, not revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocId,
    pub revision: u64,
    pub data: JsonValue,
}

impl Document {
    /// Read a top-level field, if present.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.data.get(name)
    }

    /// Read a top-level string field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(JsonValue::as_str)
    }

    /// Deserialize the payload into a typed model.
    pub fn to_model<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", self.id)))
    }
}

/// Serialize a typed model into a document payload (a JSON object).
pub fn to_payload<T: Serialize>(model: &T) -> Result<JsonValue, StoreError> {
    let value = serde_json::to_value(model)
        .map_err(|e| StoreError::Serialization(format!("payload serialization failed: {e}")))?;
    if !value.is_object() {
        return Err(StoreError::InvalidWrite(
            "document payload must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}
