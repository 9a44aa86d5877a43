//! Document representation and the JSON codec used for stored values.
//!
//! A [`Document`] is a map from field names to dynamically typed [`Value`]s. Documents are
//! stored as JSON text, one document per storage key, and are always written back whole.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// One logical record: field names mapped to dynamically typed values.
pub type Document = Map<String, Value>;

/// The name of the field that doubles as the storage key suffix.
pub const ID_FIELD: &str = "id";

/// Encodes a document into the string form stored under its key.
pub fn encode(document: &Document) -> String {
    // Map<String, Value> has string keys only, so rendering through Value cannot fail.
    Value::Object(document.clone()).to_string()
}

/// Decodes a stored string back into a document.
///
/// # Errors
///
/// Returns [`StoreError::MalformedDocument`] if the input is not valid JSON or is valid
/// JSON that is not an object.
pub fn decode(raw: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::MalformedDocument(format!(
            "expected a JSON object, found {}",
            type_name(&other)
        ))),
    }
}

/// Serializes any serde value into a document.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the value cannot be serialized or does not
/// serialize to a map.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Serialization(format!(
            "expected a value that serializes to an object, found {}",
            type_name(&other)
        ))),
    }
}

/// Renders a value the way it appears inside a storage key.
///
/// Strings are used verbatim; every other value uses its compact JSON form.
pub fn key_component(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Document operations used by the query pipeline.
pub trait DocumentExt {
    /// Returns a copy holding only the named fields that exist, in the requested order.
    fn project(&self, columns: &[String]) -> Document;

    /// Overwrites this document's fields with the patch's fields.
    fn merge(&mut self, patch: &Document);

    /// Returns the document's `id` field if it is present and not null.
    fn document_id(&self) -> Option<&Value>;
}

impl DocumentExt for Document {
    fn project(&self, columns: &[String]) -> Document {
        columns
            .iter()
            .filter_map(|column| {
                self.get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect()
    }

    fn merge(&mut self, patch: &Document) {
        for (field, value) in patch {
            self.insert(field.clone(), value.clone());
        }
    }

    fn document_id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
            .filter(|value| !value.is_null())
    }
}
