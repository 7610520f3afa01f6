//! Attribute storage for vertices and lines.
//!
//! Tags map string keys to string values (`highway=residential`,
//! `orig_id=123`, …). A `BTreeMap` keeps iteration deterministic so
//! snapshots compare and print stably.

use std::collections::BTreeMap;

/// Key → value attribute map.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Tags {
    map: BTreeMap<String, String>,
}

impl Tags {
    /// Creates an empty tag map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `k=v` pairs separated by whitespace (`"highway=residential name=Main"`).
    /// Items without `=` are ignored.
    pub fn parse(text: &str) -> Self {
        text.split_whitespace()
            .filter_map(|item| item.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Assigns `value` for `key`, returning the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.map.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Removes `key`, returning its value, if any.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates `(key, value)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
