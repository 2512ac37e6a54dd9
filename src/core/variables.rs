//! Structured session variables
//!
//! Holds the latest payload received for each out-of-band data key
//! (e.g. `Char.Vitals`). Writes replace the previous value wholesale.

use std::collections::HashMap;

use serde_json::Value;

/// Key → most recently received value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value stored under `key` (no merging)
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in arbitrary order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_key() {
        let store = VariableStore::new();
        assert_eq!(store.get("Char.Vitals"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_last_write_wins_without_merge() {
        let mut store = VariableStore::new();
        store.set("vitals", json!({"hp": 10, "maxhp": 20}));
        store.set("vitals", json!({"hp": 5}));

        assert_eq!(store.get("vitals"), Some(&json!({"hp": 5})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store = VariableStore::new();
        store.set("a", json!(1));
        store.set("b", json!("two"));

        assert_eq!(store.get("a"), Some(&json!(1)));
        assert_eq!(store.get("b"), Some(&json!("two")));

        let mut keys: Vec<_> = store.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
