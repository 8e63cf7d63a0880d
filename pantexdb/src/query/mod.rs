// Query model and the field-matching predicate used by collection scans

use crate::document::{kind_of, Document, ID_FIELD};
use crate::error::{PantexError, Result};
use serde_json::{Map, Value};
use std::fmt;

/// A partial field map. Every field must match for a document to be selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Map<String, Value>,
}

impl Query {
    /// The empty query, which matches every document.
    pub fn new() -> Self {
        Query { conditions: Map::new() }
    }

    /// A direct lookup on the identifier field.
    pub fn by_id(id: impl Into<String>) -> Self {
        Query::new().field(ID_FIELD, Value::String(id.into()))
    }

    /// Add an equality condition.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn from_json(json: &Value) -> Result<Self> {
        match json {
            Value::Object(map) => Ok(Query { conditions: map.clone() }),
            other => Err(PantexError::Other(format!(
                "Query must be a JSON object, got {}",
                kind_of(other)
            ))),
        }
    }

    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The identifier to look up directly, if the query has a usable one.
    ///
    /// A non-empty string is used as is and a number by its decimal text.
    /// Anything else leaves the identifier to the ordinary scan.
    pub fn identifier(&self) -> Option<String> {
        match self.conditions.get(ID_FIELD)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Test a document against every condition.
    ///
    /// A field that is absent or falsy in the document (`null`, `false`,
    /// `0`, `""`) never matches, even when the query asks for exactly that
    /// value: `{age: 0}` does not select a document with `age = 0`.
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| match doc.get(field) {
            Some(actual) if is_truthy(actual) => loose_eq(expected, actual),
            _ => false,
        })
    }
}

impl From<Document> for Query {
    fn from(doc: Document) -> Self {
        Query { conditions: doc.into_fields() }
    }
}

impl From<Map<String, Value>> for Query {
    fn from(conditions: Map<String, Value>) -> Self {
        Query { conditions }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.conditions.clone()))
    }
}

/// Whether a stored value counts as present for matching purposes.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Loose equality between a query value and a stored value.
///
/// Scalars of different kinds are compared numerically: strings are parsed
/// (trimmed, empty is 0) and booleans count as 1 and 0. Arrays and objects
/// compare structurally with each other and never equal a scalar.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => as_number(a) == as_number(b),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|f| !f.is_nan())
            }
        }
        _ => None,
    }
}
