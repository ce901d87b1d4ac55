//! Document driver contract.

use crate::{Criteria, Document, ID_FIELD};
use async_trait::async_trait;
use keystone_config::StoreKind;
use keystone_core::{Interface, KeystoneResult};
use serde_json::Value;

/// Raw access to a document store. No caching happens at this level.
#[async_trait]
pub trait DocumentDriver: Interface + Send + Sync {
    /// Returns the store discriminator.
    fn kind(&self) -> StoreKind;

    /// Returns the first matching document, if any.
    async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Option<Document>>;

    /// Returns every matching document, ordered and paged by the criteria.
    async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>>;

    /// Stores a document and returns it with its id.
    async fn insert_one(&self, collection: &str, document: Document) -> KeystoneResult<Document>;

    /// Stores several documents atomically.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>>;

    /// Applies a merge patch to the first matching document. Returns the number updated.
    async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64>;

    /// Applies a merge patch to every matching document. Returns the number updated.
    async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64>;

    /// Removes the first matching document. Returns the number removed.
    async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> KeystoneResult<()>;

    /// Releases connections held by the driver. Later calls do nothing.
    async fn close(&self) {}
}

/// Gives the document a UUID v4 `id` if it has none.
pub fn ensure_id(document: &mut Document) -> String {
    match document.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => {
            let id = uuid::Uuid::new_v4().to_string();
            document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
        Some(other) => other.to_string(),
    }
}

/// Applies an RFC 7396 merge patch. `id` is never changed.
pub fn merge_patch(target: &mut Document, patch: &Document) {
    for (field, value) in patch {
        if field == ID_FIELD {
            continue;
        }
        merge_field(target, field, value);
    }
}

fn merge_field(target: &mut Document, field: &str, value: &Value) {
    match value {
        Value::Null => {
            target.remove(field);
        }
        Value::Object(patch) => {
            let slot = target
                .entry(field.to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            if !slot.is_object() {
                *slot = Value::Object(Document::new());
            }
            if let Value::Object(inner) = slot {
                for (key, nested) in patch {
                    merge_field(inner, key, nested);
                }
            }
        }
        other => {
            target.insert(field.to_string(), other.clone());
        }
    }
}

/// Removes `id` from a patch so it cannot rename a document.
#[must_use]
pub fn strip_id(mut patch: Document) -> Document {
    patch.remove(ID_FIELD);
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_ensure_id_assigns_uuid() {
        let mut document = doc(json!({"name": "a"}));
        let id = ensure_id(&mut document);
        assert_eq!(id.len(), 36);
        assert_eq!(document.get("id"), Some(&json!(id)));
    }

    #[test]
    fn test_ensure_id_keeps_existing() {
        let mut document = doc(json!({"id": "U1"}));
        assert_eq!(ensure_id(&mut document), "U1");

        let mut numeric = doc(json!({"id": 7}));
        assert_eq!(ensure_id(&mut numeric), "7");
    }

    #[test]
    fn test_merge_patch() {
        let mut target = doc(json!({"id": "U1", "a": 1, "b": {"c": 1, "d": 2}, "e": 5}));
        let patch = doc(json!({"id": "X", "a": 2, "b": {"c": null, "f": 3}, "e": null, "g": [1]}));
        merge_patch(&mut target, &patch);
        assert_eq!(
            Value::Object(target),
            json!({"id": "U1", "a": 2, "b": {"d": 2, "f": 3}, "g": [1]})
        );
    }

    #[test]
    fn test_strip_id() {
        assert_eq!(strip_id(doc(json!({"id": 1, "a": 2}))), doc(json!({"a": 2})));
    }
}
