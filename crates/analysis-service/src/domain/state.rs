//! # Module State Fields
//!
//! Typed persistent fields of the runtime module. A field is either unset
//! or holds a value; reads never fabricate a value silently, callers pick
//! the fallback explicitly with [`StateValue::get_or`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single optional state slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateValue<T> {
    value: Option<T>,
}

impl<T> Default for StateValue<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Clone> StateValue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, if ever set.
    pub fn get(&self) -> Option<T> {
        self.value.clone()
    }

    /// Current value or `default` when unset.
    pub fn get_or(&self, default: T) -> T {
        self.value.clone().unwrap_or(default)
    }

    /// Current value or a lazily computed fallback.
    pub fn get_or_else(&self, default: impl FnOnce() -> T) -> T {
        self.value.clone().unwrap_or_else(default)
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

/// Keyed state, iterated in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMap<K: Ord, V> {
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for StateMap<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V: Clone> StateMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    pub fn set(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}
