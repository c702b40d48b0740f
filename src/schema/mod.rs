//! Resource schemas
//!
//! A [`Schema`] describes the attributes a resource or data source accepts
//! and exposes. It drives three things:
//!
//! - conversion between JSON and typed [`AttrValue`]s ([`Schema::decode`],
//!   [`Schema::encode`])
//! - client-side validation of declared configuration ([`Schema::validate`])
//! - the set of attributes that can be diffed, and the sensitive ones that
//!   are never read back
//!
//! # Example
//!
//! ```ignore
//! let schema = Schema::new()
//!     .with("display_name", Attribute::required(AttrKind::String))
//!     .with("environment", Attribute::required(AttrKind::block(id_block())).force_new())
//!     .with("secret", Attribute::computed(AttrKind::String).sensitive());
//! ```

mod data;
mod value;

pub use data::ResourceData;
pub use value::AttrValue;

use crate::error::ProviderError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of value an attribute holds
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttrKind {
    String,
    Int,
    Bool,
    StringSet,
    StringMap,
    /// Nested block (at most one instance)
    Block { schema: Schema },
}

impl AttrKind {
    pub fn block(schema: Schema) -> Self {
        Self::Block { schema }
    }
}

/// Who supplies the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Required,
    Optional,
    /// Optional in configuration; the server fills it in when omitted
    OptionalComputed,
    /// Read-only
    Computed,
}

/// Attribute definition
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub kind: AttrKind,
    pub presence: Presence,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exactly_one_of: Vec<&'static str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
}

impl Attribute {
    fn new(kind: AttrKind, presence: Presence) -> Self {
        Self {
            kind,
            presence,
            force_new: false,
            sensitive: false,
            exactly_one_of: Vec::new(),
            description: "",
        }
    }

    pub fn required(kind: AttrKind) -> Self {
        Self::new(kind, Presence::Required)
    }

    pub fn optional(kind: AttrKind) -> Self {
        Self::new(kind, Presence::Optional)
    }

    pub fn computed(kind: AttrKind) -> Self {
        Self::new(kind, Presence::Computed)
    }

    /// Optional and filled in by the server when omitted
    pub fn optional_computed(kind: AttrKind) -> Self {
        Self::new(kind, Presence::OptionalComputed)
    }

    /// Changing this attribute requires replacing the resource
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Exactly one attribute of `group` must be set. `group` includes self.
    pub fn exactly_one_of(mut self, group: &[&'static str]) -> Self {
        self.exactly_one_of = group.to_vec();
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether the value can come from configuration
    pub fn is_configurable(&self) -> bool {
        self.presence != Presence::Computed
    }
}

/// Attribute set of a resource, data source or nested block
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Schema {
    attributes: BTreeMap<&'static str, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }

    /// Attributes whose value is never returned by the server
    pub fn sensitive_attributes(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, attr)| attr.sensitive)
            .map(|(name, _)| name)
            .collect()
    }

    /// Attributes that can come from configuration
    pub fn configurable_attributes(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, attr)| attr.is_configurable())
            .map(|(name, _)| name)
            .collect()
    }

    /// Convert a JSON object into typed attribute values.
    ///
    /// Unknown attributes and kind mismatches are validation errors. `id`
    /// is ignored here unless the schema declares it; it is carried
    /// separately by [`ResourceData`].
    pub fn decode(&self, json: &Value) -> Result<BTreeMap<String, AttrValue>, ProviderError> {
        self.decode_at(json, "")
    }

    fn decode_at(
        &self,
        json: &Value,
        prefix: &str,
    ) -> Result<BTreeMap<String, AttrValue>, ProviderError> {
        let object = match json {
            Value::Null => return Ok(BTreeMap::new()),
            Value::Object(object) => object,
            other => {
                return Err(ProviderError::validation(format!(
                    "expected an object{}, got {}",
                    location(prefix),
                    json_type(other)
                )))
            }
        };

        let mut attrs = BTreeMap::new();
        for (name, value) in object {
            if prefix.is_empty() && name == "id" && !self.attributes.contains_key("id") {
                continue;
            }
            let path = join_path(prefix, name);
            let Some(attribute) = self.attributes.get(name.as_str()) else {
                return Err(ProviderError::validation(format!(
                    "unsupported argument {:?}",
                    path
                )));
            };
            let decoded = decode_value(&attribute.kind, value, &path)?;
            if decoded != AttrValue::Null {
                attrs.insert(name.clone(), decoded);
            }
        }
        Ok(attrs)
    }

    /// Convert typed attribute values back to JSON. Every schema attribute
    /// is emitted so that unset values appear as `null`.
    pub fn encode(&self, attrs: &BTreeMap<String, AttrValue>) -> Value {
        let mut object = Map::new();
        for (name, attribute) in self.iter() {
            let value = attrs.get(name).map(AttrValue::to_json).unwrap_or(Value::Null);
            let value = match (&attribute.kind, value) {
                (AttrKind::Block { .. }, Value::Null) => Value::Array(Vec::new()),
                (_, value) => value,
            };
            object.insert(name.to_string(), value);
        }
        Value::Object(object)
    }

    /// Check declared configuration before anything is sent.
    pub fn validate(&self, attrs: &BTreeMap<String, AttrValue>) -> Result<(), ProviderError> {
        self.validate_at(attrs, "")
    }

    fn validate_at(
        &self,
        attrs: &BTreeMap<String, AttrValue>,
        prefix: &str,
    ) -> Result<(), ProviderError> {
        let is_set = |name: &str| attrs.get(name).is_some_and(|v| !v.is_empty());
        let mut checked_groups: BTreeSet<Vec<&'static str>> = BTreeSet::new();

        for (name, attribute) in self.iter() {
            let path = join_path(prefix, name);

            match attribute.presence {
                Presence::Required if !is_set(name) => {
                    return Err(ProviderError::validation(format!(
                        "the argument {:?} is required, but no definition was found",
                        path
                    )));
                }
                Presence::Computed if is_set(name) => {
                    return Err(ProviderError::validation(format!(
                        "{:?} is read-only and cannot be set in configuration",
                        path
                    )));
                }
                _ => {}
            }

            if !attribute.exactly_one_of.is_empty() {
                let mut group = attribute.exactly_one_of.clone();
                group.sort_unstable();
                if checked_groups.insert(group.clone()) {
                    let set_count = group.iter().filter(|member| is_set(member)).count();
                    if set_count != 1 {
                        return Err(ProviderError::validation(format!(
                            "exactly one of {} must be specified{}",
                            group
                                .iter()
                                .map(|g| format!("{:?}", g))
                                .collect::<Vec<_>>()
                                .join(", "),
                            location(prefix)
                        )));
                    }
                }
            }

            if let (AttrKind::Block { schema }, Some(value)) = (&attribute.kind, attrs.get(name)) {
                if let Some(inner) = value.as_block() {
                    schema.validate_at(inner, &path)?;
                }
            }
        }
        Ok(())
    }
}

fn decode_value(kind: &AttrKind, value: &Value, path: &str) -> Result<AttrValue, ProviderError> {
    let mismatch = |expected: &str| {
        ProviderError::validation(format!(
            "{:?}: expected {}, got {}",
            path,
            expected,
            json_type(value)
        ))
    };

    if value.is_null() {
        return Ok(AttrValue::Null);
    }

    match kind {
        AttrKind::String => value
            .as_str()
            .map(AttrValue::from)
            .ok_or_else(|| mismatch("a string")),
        AttrKind::Int => value.as_i64().map(AttrValue::Int).ok_or_else(|| mismatch("an integer")),
        AttrKind::Bool => value.as_bool().map(AttrValue::Bool).ok_or_else(|| mismatch("a bool")),
        AttrKind::StringSet => {
            let items = value.as_array().ok_or_else(|| mismatch("a list of strings"))?;
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(|| mismatch("a list of strings")))
                .collect::<Result<BTreeSet<_>, _>>()
                .map(AttrValue::Set)
        }
        AttrKind::StringMap => {
            let object = value.as_object().ok_or_else(|| mismatch("a map of strings"))?;
            object
                .iter()
                .map(|(k, v)| {
                    v.as_str()
                        .map(|s| (k.clone(), s.to_string()))
                        .ok_or_else(|| mismatch("a map of strings"))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(AttrValue::Map)
        }
        AttrKind::Block { schema } => {
            // Blocks arrive either as `{..}` or `[{..}]`
            let items: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Object(_) => vec![value],
                _ => return Err(mismatch("a block")),
            };
            if items.len() > 1 {
                return Err(ProviderError::validation(format!(
                    "{:?}: at most one block is allowed, got {}",
                    path,
                    items.len()
                )));
            }
            items
                .into_iter()
                .map(|item| schema.decode_at(item, path).map(AttrValue::Object))
                .collect::<Result<Vec<_>, _>>()
                .map(AttrValue::List)
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn location(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!(" in {:?}", prefix)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// `{ id = "..." }` block used for parent references
pub fn id_block() -> Schema {
    Schema::new().with("id", Attribute::required(AttrKind::String))
}
