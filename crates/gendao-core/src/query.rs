//! Filters and sort orders.
//!
//! DAO operations accept filters and sorting in several encodings (native
//! maps, JSON text, JSON bytes, dynamic values). Each is normalised into one
//! canonical shape, [`Filter`] or [`Sorting`], before reaching a backend.

use crate::row::{decode_json_object, value_to_object};
use crate::{GendaoError, GendaoResult};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Conjunction of equality predicates, keyed by column name.
///
/// A `null` expected value matches a null or missing column. The empty
/// filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Map<String, Value>,
}

impl Filter {
    /// Creates an empty (match-all) filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality predicate.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.insert(column.into(), value.into());
        self
    }

    /// Returns the expected value for a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.predicates.get(column)
    }

    /// Iterates over `(column, expected value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.predicates.iter()
    }

    /// Number of predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether this filter matches everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Borrows the predicates as a map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.predicates
    }

    /// Evaluates the filter against a decoded row.
    #[must_use]
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.predicates.iter().all(|(column, expected)| {
            let actual = row.get(column).unwrap_or(&Value::Null);
            values_equal(actual, expected)
        })
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(predicates: Map<String, Value>) -> Self {
        Self { predicates }
    }
}

/// Equality with numeric normalisation (`1 == 1.0`).
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Total order over dynamic values used for client-side sorting.
///
/// Values of different kinds order as null < bool < number < string <
/// array < object.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i.cmp(&j),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A filter in any accepted encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    /// Already canonical.
    Filter(Filter),
    /// Column name to expected value.
    Map(Map<String, Value>),
    /// JSON object text.
    Json(String),
    /// JSON object bytes.
    Bytes(Vec<u8>),
    /// Dynamic value: an object, JSON text, or null (match all).
    Value(Value),
}

impl FilterInput {
    /// Normalises into a canonical [`Filter`].
    pub fn normalize(self) -> GendaoResult<Filter> {
        let map = match self {
            Self::Filter(filter) => return Ok(filter),
            Self::Map(map) => Some(map),
            Self::Json(text) => decode_json_object(text.as_bytes(), "filter")?,
            Self::Bytes(bytes) => decode_json_object(&bytes, "filter")?,
            Self::Value(value) => value_to_object(&value, "filter")?,
        };
        Ok(map.map(Filter::from).unwrap_or_default())
    }
}

impl From<Filter> for FilterInput {
    fn from(filter: Filter) -> Self {
        Self::Filter(filter)
    }
}

impl From<Map<String, Value>> for FilterInput {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for FilterInput {
    fn from(text: &str) -> Self {
        Self::Json(text.to_string())
    }
}

impl From<String> for FilterInput {
    fn from(text: String) -> Self {
        Self::Json(text)
    }
}

impl From<Vec<u8>> for FilterInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for FilterInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Value> for FilterInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn parse(column: &str, value: &Value) -> GendaoResult<Self> {
        let invalid = || {
            GendaoError::translation(format!(
                "Invalid sort direction {} for column '{}'",
                value, column
            ))
        };
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) if f > 0.0 => Ok(Self::Ascending),
                Some(f) if f < 0.0 => Ok(Self::Descending),
                _ => Err(invalid()),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "asc" | "ascending" | "1" => Ok(Self::Ascending),
                "desc" | "descending" | "-1" => Ok(Self::Descending),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sorting {
    fields: Vec<(String, SortOrder)>,
}

impl Sorting {
    /// Creates an empty sorting (backend default order).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an ascending key.
    #[must_use]
    pub fn asc(mut self, column: impl Into<String>) -> Self {
        self.fields.push((column.into(), SortOrder::Ascending));
        self
    }

    /// Appends a descending key.
    #[must_use]
    pub fn desc(mut self, column: impl Into<String>) -> Self {
        self.fields.push((column.into(), SortOrder::Descending));
        self
    }

    /// Sort keys in priority order.
    #[must_use]
    pub fn fields(&self) -> &[(String, SortOrder)] {
        &self.fields
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compares two decoded rows according to the sort keys.
    #[must_use]
    pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        for (column, order) in &self.fields {
            let left = a.get(column).unwrap_or(&Value::Null);
            let right = b.get(column).unwrap_or(&Value::Null);
            let ordering = match order {
                SortOrder::Ascending => compare_values(left, right),
                SortOrder::Descending => compare_values(right, left),
            };
            if ordering.is_ne() {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn from_map(map: &Map<String, Value>) -> GendaoResult<Self> {
        let fields = map
            .iter()
            .map(|(column, direction)| -> GendaoResult<(String, SortOrder)> {
                Ok((column.clone(), SortOrder::parse(column, direction)?))
            })
            .collect::<GendaoResult<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

/// A sort order in any accepted encoding.
///
/// Object encodings map column names to `1`/`-1` or `"asc"`/`"desc"`; key
/// order is the sort priority.
#[derive(Debug, Clone, PartialEq)]
pub enum SortingInput {
    Sorting(Sorting),
    Map(Map<String, Value>),
    Json(String),
    Bytes(Vec<u8>),
    Value(Value),
}

impl SortingInput {
    /// Normalises into a canonical [`Sorting`].
    pub fn normalize(self) -> GendaoResult<Sorting> {
        let map = match self {
            Self::Sorting(sorting) => return Ok(sorting),
            Self::Map(map) => Some(map),
            Self::Json(text) => decode_json_object(text.as_bytes(), "sorting")?,
            Self::Bytes(bytes) => decode_json_object(&bytes, "sorting")?,
            Self::Value(value) => value_to_object(&value, "sorting")?,
        };
        match map {
            Some(map) => Sorting::from_map(&map),
            None => Ok(Sorting::default()),
        }
    }
}

impl From<Sorting> for SortingInput {
    fn from(sorting: Sorting) -> Self {
        Self::Sorting(sorting)
    }
}

impl From<Map<String, Value>> for SortingInput {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for SortingInput {
    fn from(text: &str) -> Self {
        Self::Json(text.to_string())
    }
}

impl From<String> for SortingInput {
    fn from(text: String) -> Self {
        Self::Json(text)
    }
}

impl From<Vec<u8>> for SortingInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for SortingInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_encodings_normalize_identically() {
        let expected = Filter::new().with("id", "a").with("n", 1);
        let inputs: Vec<FilterInput> = vec![
            expected.clone().into(),
            obj(json!({"id": "a", "n": 1})).into(),
            r#"{"id":"a","n":1}"#.into(),
            br#"{"id":"a","n":1}"#.to_vec().into(),
            json!({"id": "a", "n": 1}).into(),
            json!(r#"{"id":"a","n":1}"#).into(),
        ];
        for input in inputs {
            assert_eq!(input.normalize().unwrap(), expected);
        }
    }

    #[test]
    fn test_filter_null_matches_all() {
        assert!(FilterInput::from(Value::Null).normalize().unwrap().is_empty());
        assert!(FilterInput::from("null").normalize().unwrap().is_empty());
    }

    #[test]
    fn test_filter_rejects_unsupported_encodings() {
        assert!(FilterInput::from(json!([1, 2])).normalize().unwrap_err().is_translation());
        assert!(FilterInput::from(json!(true)).normalize().unwrap_err().is_translation());
        assert!(FilterInput::from("\"text\"").normalize().unwrap_err().is_translation());
        assert!(matches!(
            FilterInput::from("{broken").normalize(),
            Err(GendaoError::Decode(_))
        ));
    }

    #[test]
    fn test_filter_matches() {
        let row = obj(json!({"id": "a", "n": 1, "x": null}));
        assert!(Filter::new().matches(&row));
        assert!(Filter::new().with("id", "a").with("n", 1.0).matches(&row));
        assert!(Filter::new().with("x", Value::Null).matches(&row));
        assert!(Filter::new().with("missing", Value::Null).matches(&row));
        assert!(!Filter::new().with("id", "b").matches(&row));
        assert!(!Filter::new().with("n", "1").matches(&row));
    }

    #[test]
    fn test_sorting_normalize_keeps_order() {
        let sorting = SortingInput::from(r#"{"b": -1, "a": 1, "c": "DESC"}"#)
            .normalize()
            .unwrap();
        assert_eq!(
            sorting.fields(),
            &[
                ("b".to_string(), SortOrder::Descending),
                ("a".to_string(), SortOrder::Ascending),
                ("c".to_string(), SortOrder::Descending),
            ]
        );
    }

    #[test]
    fn test_sorting_rejects_invalid() {
        assert!(SortingInput::from(r#"{"a": 0}"#).normalize().unwrap_err().is_translation());
        assert!(SortingInput::from(r#"{"a": "up"}"#).normalize().unwrap_err().is_translation());
        assert!(SortingInput::from(json!(["a"])).normalize().unwrap_err().is_translation());
        assert!(SortingInput::from(Value::Null).normalize().unwrap().is_empty());
    }

    #[test]
    fn test_sorting_compare() {
        let sorting = Sorting::new().asc("group").desc("score");
        let a = obj(json!({"group": 1, "score": 10}));
        let b = obj(json!({"group": 1, "score": 20}));
        let c = obj(json!({"group": 0, "score": 5}));
        assert_eq!(sorting.compare(&a, &b), Ordering::Greater);
        assert_eq!(sorting.compare(&c, &a), Ordering::Less);
        assert_eq!(sorting.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_compare_values_across_kinds() {
        assert_eq!(compare_values(&Value::Null, &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(1), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }
}
