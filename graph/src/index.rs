//! Indexes for efficient vertex lookups.

use std::collections::{HashMap, HashSet};
use strata_core::{Guid, Value};

/// Type index: type name -> set of GUIDs
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    index: HashMap<String, HashSet<Guid>>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_name: &str, guid: Guid) {
        self.index.entry(type_name.to_string()).or_default().insert(guid);
    }

    pub fn remove(&mut self, type_name: &str, guid: &Guid) {
        if let Some(set) = self.index.get_mut(type_name) {
            set.remove(guid);
            if set.is_empty() {
                self.index.remove(type_name);
            }
        }
    }

    pub fn get(&self, type_name: &str) -> impl Iterator<Item = &Guid> + '_ {
        self.index.get(type_name).into_iter().flatten()
    }
}

/// Simplified value for unique-attribute indexing.
/// Only exact matches on scalar values are indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl AttrValue {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(AttrValue::Bool(*b)),
            Value::Int(i) | Value::Date(i) => Some(AttrValue::Int(*i)),
            Value::String(s) => Some(AttrValue::String(s.clone())),
            // Null, Float, Ref, List, Map are not indexed
            _ => None,
        }
    }
}

/// Key for the unique-attribute index: (type name, attribute name, value)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub type_name: String,
    pub attr_name: String,
    pub value: AttrValue,
}

impl UniqueKey {
    pub fn new(type_name: &str, attr_name: &str, value: &Value) -> Option<Self> {
        Some(Self {
            type_name: type_name.to_string(),
            attr_name: attr_name.to_string(),
            value: AttrValue::from_value(value)?,
        })
    }
}

/// Unique-attribute index: (type, attr, value) -> GUID
#[derive(Debug, Clone, Default)]
pub struct UniqueIndex {
    index: HashMap<UniqueKey, Guid>,
}

impl UniqueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holder of a key, if any.
    pub fn get(&self, key: &UniqueKey) -> Option<&Guid> {
        self.index.get(key)
    }

    pub fn insert(&mut self, key: UniqueKey, guid: Guid) {
        self.index.insert(key, guid);
    }

    /// Remove a key only if it is held by `guid`.
    pub fn remove(&mut self, key: &UniqueKey, guid: &Guid) {
        if self.index.get(key) == Some(guid) {
            self.index.remove(key);
        }
    }
}
