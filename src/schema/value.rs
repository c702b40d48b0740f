//! Attribute values
//!
//! Declared state is stored as a tagged union per attribute kind instead of
//! untyped JSON; conversion happens once, at the schema boundary.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    /// Ordered list; nested blocks are lists of [`AttrValue::Object`]
    List(Vec<AttrValue>),
    Set(BTreeSet<String>),
    Map(BTreeMap<String, String>),
    Object(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Null, or a zero-length string/collection
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::List(v) => v.is_empty(),
            Self::Set(v) => v.is_empty(),
            Self::Map(v) => v.is_empty(),
            Self::Object(v) => v.is_empty(),
            Self::Bool(_) | Self::Int(_) => false,
        }
    }

    /// Equality that treats every flavour of "empty" as the same value
    pub fn semantically_eq(&self, other: &Self) -> bool {
        (self.is_empty() && other.is_empty()) || self == other
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// First object of a block list
    pub fn as_block(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            Self::List(items) => items.first().and_then(|i| i.as_object()),
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(|i| i.to_json()).collect()),
            Self::Set(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            ),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<BTreeMap<String, String>> for AttrValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}

impl From<BTreeSet<String>> for AttrValue {
    fn from(value: BTreeSet<String>) -> Self {
        Self::Set(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
