//! Deep merge for configuration trees.
//!
//! Implements field-by-field merging where higher tier values override lower
//! tier values. Lists are replaced entirely, not concatenated.

use crate::error::MergeError;
use crate::tree::{ConfigTree, ConfigValue};
use serde_json::Value;

/// Deep merge two trees, with `overlay` taking precedence over `base`.
///
/// - Tree nodes are merged recursively: keys in overlay override keys in base
/// - Leaves (scalars and lists) are replaced entirely
/// - A null overlay leaf preserves the base value (null means "not specified")
/// - A tree node colliding with a leaf at the same key is a
///   [`MergeError::PathConflict`]
pub fn deep_merge(base: ConfigTree, overlay: ConfigTree) -> Result<ConfigTree, MergeError> {
    let mut merged = base;
    for (key, overlay_value) in overlay {
        let value = match (merged.remove(&key), overlay_value) {
            (Some(ConfigValue::Tree(base_tree)), ConfigValue::Tree(overlay_tree)) => {
                ConfigValue::Tree(deep_merge(base_tree, overlay_tree)?)
            }
            (Some(base_value), ConfigValue::Leaf(Value::Null)) => base_value,
            (Some(ConfigValue::Tree(_)), ConfigValue::Leaf(_))
            | (Some(ConfigValue::Leaf(_)), ConfigValue::Tree(_)) => {
                return Err(MergeError::path_conflict(key));
            }
            (_, overlay_value) => overlay_value,
        };
        merged.insert(key, value);
    }
    Ok(merged)
}

/// Merge multiple trees in order, with later trees taking precedence.
///
/// Equivalent to folding [`deep_merge`] over the list.
pub fn deep_merge_all(
    trees: impl IntoIterator<Item = ConfigTree>,
) -> Result<ConfigTree, MergeError> {
    trees
        .into_iter()
        .try_fold(ConfigTree::new(), deep_merge)
}
