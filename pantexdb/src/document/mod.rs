// Document model - a JSON field map with one reserved identifier field

pub mod codec;

use crate::error::{PantexError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the reserved identifier field. Its value is also the file stem.
pub const ID_FIELD: &str = "_id";

/// A schemaless document: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document { fields: Map::new() }
    }

    /// The identifier, if the document carries a non-empty string `_id`.
    pub fn id(&self) -> Option<&str> {
        match self.fields.get(ID_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields
            .insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Shallow merge: every key in `patch` overwrites or adds the matching
    /// key here. The identifier field of the patch is skipped.
    pub fn merge(&mut self, patch: &Document) {
        for (key, value) in &patch.fields {
            if key == ID_FIELD {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Build a document from any value that serializes to a map.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        Document::try_from(serde_json::to_value(value)?)
    }

    /// Deserialize the document's fields into a typed value.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Document { fields }
    }
}

impl TryFrom<Value> for Document {
    type Error = PantexError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Document { fields }),
            other => Err(PantexError::MalformedDocument(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.fields)
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn test_id_requires_non_empty_string() {
        assert_eq!(doc(json!({ "_id": "abc" })).id(), Some("abc"));
        assert_eq!(doc(json!({ "_id": "" })).id(), None);
        assert_eq!(doc(json!({ "_id": 12 })).id(), None);
        assert_eq!(doc(json!({ "name": "Tim" })).id(), None);
    }

    #[test]
    fn test_merge_is_shallow_and_keeps_id() {
        let mut base = doc(json!({
            "_id": "a1",
            "name": "Anke",
            "age": 23,
            "address": { "city": "Berlin", "zip": "10115" }
        }));
        let patch = doc(json!({
            "_id": "other",
            "age": 24,
            "address": { "city": "Hamburg" }
        }));

        base.merge(&patch);

        assert_eq!(
            Value::from(base),
            json!({
                "_id": "a1",
                "name": "Anke",
                "age": 24,
                "address": { "city": "Hamburg" }
            })
        );
    }

    #[test]
    fn test_try_from_rejects_non_objects() {
        let err = Document::try_from(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, PantexError::MalformedDocument(_)));
    }

    #[test]
    fn test_typed_conversion() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct User {
            name: String,
            age: u32,
        }

        let user = User { name: "Tim".into(), age: 22 };
        let mut d = Document::from_serializable(&user).unwrap();
        d.set_id("t1");
        assert_eq!(d.get("name"), Some(&json!("Tim")));

        let back: User = d.deserialize_into().unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_from_serializable_rejects_scalars() {
        assert!(Document::from_serializable(&42).is_err());
    }
}
