//! Typed-value coercion.
//!
//! Business object attributes are dynamically typed ([`Value`]). Reading one
//! as a concrete Rust type goes through [`FromAttr`], which tries to convert
//! the stored value (e.g. the string `"42"` read as `i64`) instead of
//! requiring an exact type match.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Conversion from a dynamic attribute value into a concrete type.
pub trait FromAttr: Sized {
    /// Human readable name of the target type, used in error messages.
    const TARGET: &'static str;

    /// Attempts the conversion, describing the failure on error.
    fn from_attr(value: &Value) -> Result<Self, String>;
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn unsupported(value: &Value, target: &str) -> String {
    format!("{} value is not convertible to {}", describe(value), target)
}

impl FromAttr for String {
    const TARGET: &'static str = "string";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Array(_) | Value::Object(_) => Ok(value.to_string()),
            Value::Null => Err(unsupported(value, Self::TARGET)),
        }
    }
}

impl FromAttr for i64 {
    const TARGET: &'static str = "i64";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i)
                } else if let Some(u) = n.as_u64() {
                    i64::try_from(u).map_err(|e| e.to_string())
                } else {
                    n.as_f64()
                        .ok_or_else(|| unsupported(value, Self::TARGET))
                        .and_then(float_to_i64)
                }
            }
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().or_else(|_| {
                    s.parse::<f64>()
                        .map_err(|e| format!("'{}' is not numeric: {}", s, e))
                        .and_then(float_to_i64)
                })
            }
            _ => Err(unsupported(value, Self::TARGET)),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(f: f64) -> Result<i64, String> {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Ok(f.trunc() as i64)
    } else {
        Err(format!("{} is out of range for i64", f))
    }
}

impl FromAttr for i32 {
    const TARGET: &'static str = "i32";

    fn from_attr(value: &Value) -> Result<Self, String> {
        let wide = i64::from_attr(value)?;
        i32::try_from(wide).map_err(|_| format!("{} is out of range for i32", wide))
    }
}

impl FromAttr for u64 {
    const TARGET: &'static str = "u64";

    fn from_attr(value: &Value) -> Result<Self, String> {
        if let Value::Number(n) = value {
            if let Some(u) = n.as_u64() {
                return Ok(u);
            }
        }
        let wide = i64::from_attr(value)?;
        u64::try_from(wide).map_err(|_| format!("{} is out of range for u64", wide))
    }
}

impl FromAttr for f64 {
    const TARGET: &'static str = "f64";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64().ok_or_else(|| unsupported(value, Self::TARGET)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}' is not numeric: {}", s, e)),
            _ => Err(unsupported(value, Self::TARGET)),
        }
    }
}

impl FromAttr for bool {
    const TARGET: &'static str = "bool";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "on" => Ok(true),
                "false" | "f" | "no" | "n" | "off" | "" => Ok(false),
                other => other
                    .parse::<f64>()
                    .map(|f| f != 0.0)
                    .map_err(|_| format!("'{}' is not a boolean", s)),
            },
            _ => Err(unsupported(value, Self::TARGET)),
        }
    }
}

impl FromAttr for DateTime<Utc> {
    const TARGET: &'static str = "datetime";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("'{}' is not an RFC 3339 timestamp: {}", s, e)),
            Value::Number(_) => {
                let secs = i64::from_attr(value)?;
                Utc.timestamp_opt(secs, 0)
                    .single()
                    .ok_or_else(|| format!("{} is not a valid unix timestamp", secs))
            }
            _ => Err(unsupported(value, Self::TARGET)),
        }
    }
}

impl FromAttr for Vec<Value> {
    const TARGET: &'static str = "array";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => Ok(items.clone()),
            _ => Err(unsupported(value, Self::TARGET)),
        }
    }
}

impl FromAttr for Map<String, Value> {
    const TARGET: &'static str = "object";

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(map.clone()),
            _ => Err(unsupported(value, Self::TARGET)),
        }
    }
}

impl FromAttr for Value {
    const TARGET: &'static str = "value";

    fn from_attr(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl<T: FromAttr> FromAttr for Option<T> {
    const TARGET: &'static str = T::TARGET;

    fn from_attr(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_attr(other).map(Some),
        }
    }
}

/// Converts `value` into `T`.
pub fn coerce<T: FromAttr>(value: &Value) -> Result<T, String> {
    T::from_attr(value)
}
