//! The nested configuration tree and its accessor API.
//!
//! A [`ConfigTree`] maps string keys to either scalar leaves or further
//! trees. Trees are built by splitting flat dotted argument names (such as
//! `neuron.axon_port`) on `.` and creating intermediate nodes on demand.
//! The reserved [`IS_SET_KEY`] entry records which flat keys were explicitly
//! supplied rather than defaulted.

use crate::error::MergeError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved tree entry holding the flat provenance map
/// (dotted key → `true` for every explicitly-set key).
pub const IS_SET_KEY: &str = "__is_set";

/// A single entry in a [`ConfigTree`]: either a scalar leaf or a subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A nested tree node.
    Tree(ConfigTree),
    /// A scalar or list value, mirroring the types the argument
    /// specification produces (strings, numbers, booleans, lists).
    Leaf(Value),
}

impl ConfigValue {
    /// The nested tree, if this entry is one.
    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Tree(tree) => Some(tree),
            ConfigValue::Leaf(_) => None,
        }
    }

    /// The leaf value, if this entry is one.
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            ConfigValue::Leaf(value) => Some(value),
            ConfigValue::Tree(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_leaf().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_leaf().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_leaf().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_leaf().and_then(Value::as_bool)
    }
}

/// A nested string-keyed configuration mapping.
///
/// Addressing uses one explicit convention: [`ConfigTree::get`] for a single
/// level and [`ConfigTree::get_path`] for dotted paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigTree {
    #[serde(flatten)]
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a flat map of dotted keys, creating intermediate
    /// nodes for every path segment except the last.
    pub fn from_flat(flat: BTreeMap<String, Value>) -> Result<Self, MergeError> {
        let mut tree = Self::new();
        for (key, value) in flat {
            tree.insert_path(&key, value)?;
        }
        Ok(tree)
    }

    /// Look up a direct child entry.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Walk a dotted path (`a.b.c`) down through nested trees.
    pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
        let mut segments = path.split('.');
        let mut entry = self.entries.get(segments.next()?)?;
        for segment in segments {
            entry = entry.as_tree()?.get(segment)?;
        }
        Some(entry)
    }

    /// Insert a leaf at a dotted path, creating intermediate tree nodes.
    ///
    /// Fails with [`MergeError::PathConflict`] when an intermediate segment
    /// is already bound to a scalar, or when the final segment is already a
    /// tree node.
    pub fn insert_path(&mut self, path: &str, value: Value) -> Result<(), MergeError> {
        let mut segments = path.split('.').peekable();
        let mut node = self;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                if matches!(node.entries.get(segment), Some(ConfigValue::Tree(_))) {
                    return Err(MergeError::path_conflict(path));
                }
                node.entries.insert(segment.to_string(), ConfigValue::Leaf(value));
                return Ok(());
            }
            let slot = node
                .entries
                .entry(segment.to_string())
                .or_insert_with(|| ConfigValue::Tree(ConfigTree::new()));
            node = match slot {
                ConfigValue::Tree(tree) => tree,
                ConfigValue::Leaf(_) => return Err(MergeError::path_conflict(path)),
            };
        }
        Ok(())
    }

    /// Insert a direct child entry, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.entries.insert(key.into(), value);
    }

    /// Remove and return a direct child entry.
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over direct child entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record the provenance map under the reserved [`IS_SET_KEY`] entry.
    pub(crate) fn set_provenance(&mut self, keys: impl IntoIterator<Item = String>) {
        let map: serde_json::Map<String, Value> =
            keys.into_iter().map(|k| (k, Value::Bool(true))).collect();
        self.entries
            .insert(IS_SET_KEY.to_string(), ConfigValue::Leaf(Value::Object(map)));
    }

    /// Whether the given flat dotted key was explicitly supplied (on the
    /// command line or via the defaults file) rather than defaulted.
    ///
    /// Keys absent from the provenance map are implicitly "not set".
    pub fn is_set(&self, key: &str) -> bool {
        match self.entries.get(IS_SET_KEY) {
            Some(ConfigValue::Leaf(Value::Object(map))) => map.contains_key(key),
            _ => false,
        }
    }
}

impl IntoIterator for ConfigTree {
    type Item = (String, ConfigValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
