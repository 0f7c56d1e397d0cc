//! Backend row encodings.

use crate::{GendaoError, GendaoResult};
use serde_json::{Map, Value};

/// A row as handed over by (or to) a backend session.
///
/// Backends return rows in whichever encoding is natural to them. Row
/// mappers match on this enum instead of probing runtime types.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Column name to value.
    Map(Map<String, Value>),
    /// A JSON document as text.
    Json(String),
    /// A JSON document as raw bytes.
    Bytes(Vec<u8>),
    /// A dynamic value; objects, JSON strings and null are accepted.
    Value(Value),
    /// Indirection around another row.
    Boxed(Box<Row>),
}

impl Row {
    /// Wraps this row in one level of indirection.
    #[must_use]
    pub fn boxed(self) -> Self {
        Self::Boxed(Box::new(self))
    }

    /// Strips every level of [`Row::Boxed`] indirection.
    #[must_use]
    pub fn unwrapped(&self) -> &Row {
        let mut current = self;
        while let Self::Boxed(inner) = current {
            current = inner;
        }
        current
    }

    /// Returns the column map if this row is (a boxed) [`Row::Map`].
    #[must_use]
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self.unwrapped() {
            Self::Map(map) => Some(map),
            Self::Value(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Decodes any accepted encoding into a column map.
    ///
    /// Null values and empty JSON payloads decode to `None`.
    pub fn to_map(&self) -> GendaoResult<Option<Map<String, Value>>> {
        match self.unwrapped() {
            Self::Map(map) => Ok(Some(map.clone())),
            Self::Json(text) => decode_json_object(text.as_bytes(), "row"),
            Self::Bytes(bytes) => decode_json_object(bytes, "row"),
            Self::Value(value) => value_to_object(value, "row"),
            Self::Boxed(inner) => inner.to_map(),
        }
    }
}

/// Parses JSON bytes that must hold an object (or null).
pub(crate) fn decode_json_object(bytes: &[u8], what: &str) -> GendaoResult<Option<Map<String, Value>>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| GendaoError::Decode(format!("Malformed JSON {}: {}", what, e)))?;
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(GendaoError::translation(format!(
            "Expected a JSON object for {}, got {}",
            what, other
        ))),
    }
}

/// Interprets a dynamic value as an object: objects as-is, strings as JSON text.
pub(crate) fn value_to_object(value: &Value, what: &str) -> GendaoResult<Option<Map<String, Value>>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map.clone())),
        Value::String(text) => decode_json_object(text.as_bytes(), what),
        other => Err(GendaoError::translation(format!(
            "Cannot interpret {} as {}",
            other, what
        ))),
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<String> for Row {
    fn from(text: String) -> Self {
        Self::Json(text)
    }
}

impl From<&str> for Row {
    fn from(text: &str) -> Self {
        Self::Json(text.to_string())
    }
}

impl From<Vec<u8>> for Row {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for Row {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}
