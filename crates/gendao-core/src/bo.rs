//! Generic business object.
//!
//! A [`GenericBo`] is a backend agnostic bag of named, dynamically typed
//! attributes. It converts losslessly to and from JSON and is the only shape
//! DAOs exchange with row mappers and callers.

use crate::coerce::FromAttr;
use crate::{GendaoError, GendaoResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dynamically typed attribute container.
///
/// Attribute names are case-sensitive and unique. Reads accept either a
/// top-level name or a path such as `address.city` or `tags[0]`; a verbatim
/// top-level key always wins over path interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenericBo {
    attrs: Map<String, Value>,
}

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        } else if rest.is_empty() {
            return None;
        }
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            let index = inner[..close].trim().parse::<usize>().ok()?;
            segments.push(PathSegment::Index(index));
            rest = &inner[close + 1..];
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

fn is_path(name: &str) -> bool {
    name.contains('.') || name.contains('[')
}

impl GenericBo {
    /// Creates an empty business object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object into a business object.
    pub fn from_json(data: impl AsRef<[u8]>) -> GendaoResult<Self> {
        let value: Value = serde_json::from_slice(data.as_ref())?;
        Self::try_from(value)
    }

    /// Builds a business object from any serializable value via JSON.
    pub fn from_serializable<T: Serialize + ?Sized>(source: &T) -> GendaoResult<Self> {
        let value = serde_json::to_value(source)?;
        Self::try_from(value)
    }

    /// Replaces all attributes with the JSON representation of `source`.
    pub fn import_via_json<T: Serialize + ?Sized>(&mut self, source: &T) -> GendaoResult<()> {
        *self = Self::from_serializable(source)?;
        Ok(())
    }

    /// Serializes the attributes as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        self.to_json_string().into_bytes()
    }

    /// Serializes the attributes as a JSON object string.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        Value::Object(self.attrs.clone()).to_string()
    }

    /// Deserializes the attributes into an application type via JSON.
    pub fn transfer_via_json<T: DeserializeOwned>(&self) -> GendaoResult<T> {
        serde_json::from_value(Value::Object(self.attrs.clone()))
            .map_err(|e| GendaoError::Decode(format!("Cannot transfer business object: {}", e)))
    }

    /// Returns the raw value stored under `name`.
    #[must_use]
    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.attrs.get(name) {
            return Some(value);
        }
        if !is_path(name) {
            return None;
        }
        let segments = parse_path(name)?;
        let mut iter = segments.iter();
        let mut current = match iter.next()? {
            PathSegment::Key(key) => self.attrs.get(key)?,
            PathSegment::Index(_) => return None,
        };
        for segment in iter {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Reads an attribute, coercing it to `T`.
    ///
    /// Fails if the attribute is missing or cannot be converted.
    pub fn get_attr<T: FromAttr>(&self, name: &str) -> GendaoResult<T> {
        let value = self
            .get_raw(name)
            .ok_or_else(|| GendaoError::AttributeNotFound(name.to_string()))?;
        T::from_attr(value).map_err(|reason| GendaoError::type_conversion(name, T::TARGET, reason))
    }

    /// Reads an attribute, returning `None` when missing or unconvertible.
    #[must_use]
    pub fn get_attr_opt<T: FromAttr>(&self, name: &str) -> Option<T> {
        self.get_attr(name).ok()
    }

    /// Reads an attribute, returning `T::default()` when missing or unconvertible.
    #[must_use]
    pub fn get_attr_or_default<T: FromAttr + Default>(&self, name: &str) -> T {
        self.get_attr_opt(name).unwrap_or_default()
    }

    /// Reads a timestamp attribute stored as text in a custom `chrono` format.
    ///
    /// Layouts without a timezone are interpreted as UTC; date-only layouts
    /// resolve to midnight. Non-string values fall back to the regular
    /// timestamp coercion.
    pub fn get_time_with_layout(&self, name: &str, layout: &str) -> GendaoResult<DateTime<Utc>> {
        let value = self
            .get_raw(name)
            .ok_or_else(|| GendaoError::AttributeNotFound(name.to_string()))?;
        let Value::String(text) = value else {
            return self.get_attr(name);
        };
        if let Ok(dt) = DateTime::parse_from_str(text, layout) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Ok(naive.and_utc());
        }
        let date = NaiveDate::parse_from_str(text, layout)
            .map_err(|e| GendaoError::type_conversion(name, "datetime", e))?;
        date.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| GendaoError::type_conversion(name, "datetime", "invalid midnight"))
    }

    /// Sets or overwrites a top-level attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Sets a value at a nested path, creating missing intermediate objects.
    ///
    /// A sequence index must address an existing element or append at
    /// exactly the current length.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> GendaoResult<&mut Self> {
        let segments =
            parse_path(path).ok_or_else(|| GendaoError::translation(format!("Invalid attribute path '{}'", path)))?;
        let (first, rest) = match segments.split_first() {
            Some((PathSegment::Key(key), rest)) => (key.clone(), rest),
            _ => {
                return Err(GendaoError::translation(format!(
                    "Attribute path '{}' must start with a name",
                    path
                )))
            }
        };

        let mut slot = self.attrs.entry(first).or_insert(Value::Null);
        for segment in rest {
            slot = descend(slot, segment, path)?;
        }
        *slot = value.into();
        Ok(self)
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    /// Checks whether an attribute (or path) is present.
    #[must_use]
    pub fn contains_attr(&self, name: &str) -> bool {
        self.get_raw(name).is_some()
    }

    /// Number of top-level attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether the object holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Removes every attribute.
    pub fn clear(&mut self) {
        self.attrs.clear();
    }

    /// Iterates over top-level attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attrs.iter()
    }

    /// Borrows the underlying attribute map.
    #[must_use]
    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Consumes the object, returning the attribute map.
    #[must_use]
    pub fn into_attrs(self) -> Map<String, Value> {
        self.attrs
    }
}

fn descend<'a>(slot: &'a mut Value, segment: &PathSegment, path: &str) -> GendaoResult<&'a mut Value> {
    match segment {
        PathSegment::Key(key) => {
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            match slot {
                Value::Object(map) => Ok(map.entry(key.clone()).or_insert(Value::Null)),
                other => Err(GendaoError::translation(format!(
                    "Cannot set '{}' in path '{}': parent is not an object ({})",
                    key, path, other
                ))),
            }
        }
        PathSegment::Index(index) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            match slot {
                Value::Array(items) => {
                    if *index == items.len() {
                        items.push(Value::Null);
                    }
                    let len = items.len();
                    items.get_mut(*index).ok_or_else(|| {
                        GendaoError::translation(format!(
                            "Index {} out of bounds (len {}) in path '{}'",
                            index, len, path
                        ))
                    })
                }
                other => Err(GendaoError::translation(format!(
                    "Cannot index [{}] in path '{}': parent is not an array ({})",
                    index, path, other
                ))),
            }
        }
    }
}

impl From<Map<String, Value>> for GenericBo {
    fn from(attrs: Map<String, Value>) -> Self {
        Self { attrs }
    }
}

impl TryFrom<Value> for GenericBo {
    type Error = GendaoError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(attrs) => Ok(Self { attrs }),
            other => Err(GendaoError::Decode(format!(
                "Expected a JSON object for a business object, got {}",
                other
            ))),
        }
    }
}

impl From<GenericBo> for Value {
    fn from(bo: GenericBo) -> Self {
        Value::Object(bo.attrs)
    }
}

impl<'a> IntoIterator for &'a GenericBo {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}
