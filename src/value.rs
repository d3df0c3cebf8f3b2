//! Runtime values carried by raw entries, mapped fields, and filter arguments.

use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::constants::schema::{
    TYPE_ALIASES, TYPE_ARRAY, TYPE_BOOLEAN, TYPE_DOUBLE, TYPE_INTEGER, TYPE_STRING,
};

/// Semantic type of a mapped field, independent of its Rust storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// `true` / `false`.
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    String,
    /// Ordered list of values.
    Array,
}

impl SemanticType {
    /// Every semantic type, in canonical order.
    pub const ALL: [SemanticType; 5] = [
        SemanticType::Boolean,
        SemanticType::Integer,
        SemanticType::Double,
        SemanticType::String,
        SemanticType::Array,
    ];

    /// Canonical type name (`boolean`, `integer`, `double`, `string`, `array`).
    pub const fn as_str(self) -> &'static str {
        match self {
            SemanticType::Boolean => TYPE_BOOLEAN,
            SemanticType::Integer => TYPE_INTEGER,
            SemanticType::Double => TYPE_DOUBLE,
            SemanticType::String => TYPE_STRING,
            SemanticType::Array => TYPE_ARRAY,
        }
    }

    /// Resolve a declared type name, normalizing `bool`, `int`, and `float` first.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = normalize_type_name(name);
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a type alias to its canonical name; other names pass through unchanged.
pub fn normalize_type_name(name: &str) -> &str {
    TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// Dynamically typed value. Equality is strict: `Integer(5) != Double(5.0)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Double(f64),
    /// Text value.
    String(String),
    /// Ordered list.
    Array(Vec<Value>),
    /// Nested raw object kept inside arrays (e.g. per-language usage entries).
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Semantic type of this value; `None` for `Null` and `Map`.
    pub fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            Value::Boolean(_) => Some(SemanticType::Boolean),
            Value::Integer(_) => Some(SemanticType::Integer),
            Value::Double(_) => Some(SemanticType::Double),
            Value::String(_) => Some(SemanticType::String),
            Value::Array(_) => Some(SemanticType::Array),
            Value::Null | Value::Map(_) => None,
        }
    }

    /// Runtime type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Map(_) => "map",
            other => other
                .semantic_type()
                .map(SemanticType::as_str)
                .unwrap_or("unknown"),
        }
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Double payload, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Array items, if any.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Nested map entries, if any.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Ordering between two numbers of the same semantic type.
    ///
    /// Mixed or non-numeric operands are unordered.
    pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => Some(left.cmp(right)),
            (Value::Double(left), Value::Double(right)) => left.partial_cmp(right),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) => f.write_str(value),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Boolean(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(integer) => Value::Integer(integer),
                None => number.as_f64().map(Value::Double).unwrap_or(Value::Null),
            },
            serde_json::Value::String(value) => Value::String(value),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(items: Vec<V>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Value {
    fn from(items: [V; N]) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
