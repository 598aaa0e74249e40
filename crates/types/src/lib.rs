//! Dynamically-typed scalar value used for row fields and index keys.
//!
//! Rows in this engine are schema-less JSON objects, so a single `Value`
//! enum stands in for every field: numbers, strings, booleans and null.
//! `Value` serializes to exactly the JSON scalar it represents (not a
//! tagged enum) so that a `Row` (a map of `String -> Value`) round-trips
//! through `serde_json` as the plain JSON object the page format stores.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// The declared type of a schema column, used by the schema manager's
/// coercion rules (§4.E Insert in the spec).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    Number,
    Text,
    Bool,
    Date,
    Any,
}

impl SqlType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "NUMBER" | "ANGKA" => Some(Self::Number),
            "TEXT" | "STRING" => Some(Self::Text),
            "BOOLEAN" | "BENAR_SALAH" => Some(Self::Bool),
            "DATE" | "TANGGAL" => Some(Self::Date),
            "ANY" => Some(Self::Any),
            _ => None,
        }
    }
}

/// A JSON-comparable scalar: number, string, boolean or null.
#[derive(Clone, Debug)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// `ANGKA`/`NUMBER` coercion: accept numbers and numeric strings.
    pub fn coerce_number(&self) -> Option<Value> {
        match self {
            Value::Number(_) => Some(self.clone()),
            Value::Text(s) => s.trim().parse::<f64>().ok().map(Value::Number),
            _ => None,
        }
    }

    /// `BENAR_SALAH`/`BOOLEAN` coercion: `"true"|"false"|0|1` accepted.
    pub fn coerce_bool(&self) -> Option<Value> {
        match self {
            Value::Bool(_) => Some(self.clone()),
            Value::Number(n) if *n == 0.0 => Some(Value::Bool(false)),
            Value::Number(n) if *n == 1.0 => Some(Value::Bool(true)),
            Value::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    /// `TANGGAL`/`DATE` coercion: normalize to an ISO-8601 string.
    /// Accepts anything `chrono` can parse as a date or date-time and
    /// re-renders it; a value already in ISO-8601 form passes through.
    pub fn coerce_date(&self) -> Option<Value> {
        let s = match self {
            Value::Text(s) => s.as_str(),
            _ => return None,
        };
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Value::Text(d.format("%Y-%m-%d").to_string()));
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(Value::Text(dt.to_rfc3339()));
        }
        None
    }

    /// Comparison used by `WHERE`, `ORDER BY`, index keys and `BETWEEN`.
    /// Cross-type comparisons (besides against `Null`) are not ordered.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    pub fn values_equal(&self, other: &Value) -> bool {
        matches!(self.partial_compare(other), Some(Ordering::Equal))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Null => serializer.serialize_none(),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON scalar (number, string, bool or null)")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        d.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
