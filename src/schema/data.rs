//! Declared resource state

use super::{AttrValue, Presence, Schema};
use crate::error::ProviderError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// State of one resource instance: its id, its attributes, and whether it
/// was created or imported during the current operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceData {
    id: String,
    attrs: BTreeMap<String, AttrValue>,
    is_new: bool,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attrs: BTreeMap<String, AttrValue>) -> Self {
        Self {
            attrs,
            ..Default::default()
        }
    }

    /// Decode JSON through `schema`; an `"id"` member becomes the id.
    pub fn from_json(schema: &Schema, json: &Value) -> Result<Self, ProviderError> {
        let mut data = Self::from_attributes(schema.decode(json)?);
        if let Some(id) = json.get("id").and_then(|v| v.as_str()) {
            data.set_id(id);
        }
        Ok(data)
    }

    /// Encode through `schema`, with `"id"` alongside the attributes
    pub fn to_json(&self, schema: &Schema) -> Value {
        let mut json = schema.encode(&self.attrs);
        if let Value::Object(ref mut map) = json {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        json
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    /// An empty id means the resource is no longer tracked
    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn is_new_resource(&self) -> bool {
        self.is_new
    }

    pub fn mark_new_resource(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Non-empty string value
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }

    /// String value, empty when unset
    pub fn get_string(&self, name: &str) -> String {
        self.get_str(name).unwrap_or_default().to_string()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    pub fn get_map(&self, name: &str) -> BTreeMap<String, String> {
        match self.get(name) {
            Some(AttrValue::Map(map)) => map.clone(),
            _ => BTreeMap::new(),
        }
    }

    pub fn get_set(&self, name: &str) -> BTreeSet<String> {
        match self.get(name) {
            Some(AttrValue::Set(set)) => set.clone(),
            _ => BTreeSet::new(),
        }
    }

    /// The single object of a nested block
    pub fn block(&self, name: &str) -> Option<&BTreeMap<String, AttrValue>> {
        self.get(name).and_then(|v| v.as_block())
    }

    /// Whether a nested block is present (an empty block still counts)
    pub fn has_block(&self, name: &str) -> bool {
        self.block(name).is_some()
    }

    /// String field of a nested block
    pub fn block_str(&self, name: &str, field: &str) -> Option<&str> {
        self.block(name)
            .and_then(|b| b.get(field))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn block_int(&self, name: &str, field: &str) -> Option<i64> {
        self.block(name).and_then(|b| b.get(field)).and_then(|v| v.as_int())
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// Populate a nested block with a single object
    pub fn set_block(&mut self, name: &str, fields: BTreeMap<String, AttrValue>) {
        self.set(name, AttrValue::List(vec![AttrValue::Object(fields)]));
    }

    /// `{ id = ... }` block
    pub fn set_id_block(&mut self, name: &str, id: &str) {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), AttrValue::from(id));
        self.set_block(name, fields);
    }

    /// Explicitly clear a nested block
    pub fn clear_block(&mut self, name: &str) {
        self.set(name, AttrValue::List(Vec::new()));
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.attrs.remove(name)
    }

    /// Configurable attributes whose value differs from `other`. An
    /// optional-computed attribute left unset keeps the server's value and
    /// does not count as a change.
    pub fn changed_attributes(&self, other: &ResourceData, schema: &Schema) -> BTreeSet<String> {
        schema
            .iter()
            .filter(|(_, attribute)| attribute.is_configurable())
            .filter(|(name, attribute)| {
                let ours = self.get(name).cloned().unwrap_or_default();
                if attribute.presence == Presence::OptionalComputed && ours.is_empty() {
                    return false;
                }
                let theirs = other.get(name).cloned().unwrap_or_default();
                !ours.semantically_eq(&theirs)
            })
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Field-for-field equality (including id) ignoring the listed attributes
    pub fn equal_ignoring(&self, other: &ResourceData, ignore: &[&str]) -> bool {
        if self.id != other.id {
            return false;
        }
        let names: BTreeSet<&String> = self.attrs.keys().chain(other.attrs.keys()).collect();
        names
            .into_iter()
            .filter(|name| !ignore.contains(&name.as_str()))
            .all(|name| {
                let ours = self.get(name).cloned().unwrap_or_default();
                let theirs = other.get(name).cloned().unwrap_or_default();
                ours.semantically_eq(&theirs)
            })
    }
}
