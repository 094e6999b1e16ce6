//! State shared by every level and hook of one execution.
//!
//! There is no namespacing: a level exporting its key list under a name
//! that already exists is refused and reported, leaving the earlier value
//! in place.

use crate::key::GroupKey;
use serde_json::Value;
use std::collections::HashMap;

/// A named entry in [`SharedState`].
#[derive(Debug, Clone, PartialEq)]
pub enum SharedValue {
    /// An ordered group-key list exported by a level.
    GroupKeys(Vec<GroupKey>),
    /// An arbitrary value written by a hook.
    Value(Value),
}

/// Mutable key/value store visible to all levels of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedState {
    entries: HashMap<String, SharedValue>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SharedValue> {
        self.entries.get(name)
    }

    /// Key list exported under `name`, if that entry is an export.
    pub fn group_keys(&self, name: &str) -> Option<&[GroupKey]> {
        match self.entries.get(name) {
            Some(SharedValue::GroupKeys(keys)) => Some(keys),
            _ => None,
        }
    }

    /// Hook-written value under `name`, if that entry is a plain value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.entries.get(name) {
            Some(SharedValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.entries.get_mut(name) {
            Some(SharedValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Write a value, replacing whatever was stored under `name`.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<SharedValue> {
        self.entries.insert(name.into(), SharedValue::Value(value))
    }

    /// Publish a level's ordered key list.
    ///
    /// Returns `false` and logs a warning if `name` is already taken; the
    /// existing entry is kept.
    pub fn export_group_keys(&mut self, name: &str, keys: &[GroupKey]) -> bool {
        if self.contains(name) {
            tracing::warn!(
                name,
                existing = ?self.get(name),
                "shared state already has this name, export skipped"
            );
            return false;
        }
        self.entries
            .insert(name.to_string(), SharedValue::GroupKeys(keys.to_vec()));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
