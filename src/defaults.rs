//! Defaults file handling.
//!
//! The `--config` option points at a YAML document holding a flat mapping of
//! dotted argument names to values. Every failure here is non-fatal: the
//! error is reported and resolution continues with the spec's built-in
//! defaults.

use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Expand a leading `~` to the user's home directory.
///
/// Paths that keep their `~` (no home directory available) or carry none
/// are returned unchanged; relative paths resolve against the current
/// working directory when read.
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

/// Load the defaults file into a flat dotted-key layer.
///
/// Keys the spec does not declare are skipped with a warning. A missing,
/// unreadable, or malformed file yields an empty layer.
pub(crate) fn load_file_layer(path: &Path, declared: &HashSet<String>) -> BTreeMap<String, Value> {
    let path = expand_home(path);

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "error loading config defaults from {}: {e}; using built-in defaults",
                path.display()
            );
            return BTreeMap::new();
        }
    };

    let parsed: Value = match serde_yaml::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(
                "error loading config defaults from {}: {e}; using built-in defaults",
                path.display()
            );
            return BTreeMap::new();
        }
    };

    let Value::Object(map) = parsed else {
        warn!(
            "config defaults file {} is not a flat mapping; using built-in defaults",
            path.display()
        );
        return BTreeMap::new();
    };

    info!("loading config defaults from: {}", path.display());

    let mut layer = BTreeMap::new();
    for (key, value) in map {
        if declared.contains(&key) {
            layer.insert(key, value);
        } else {
            warn!("ignoring unknown key '{key}' in {}", path.display());
        }
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn declared(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_missing_file_yields_empty_layer() {
        let temp = TempDir::new().unwrap();
        let layer = load_file_layer(&temp.path().join("absent.yaml"), &declared(&["a"]));
        assert!(layer.is_empty());
    }

    #[test]
    fn test_malformed_yaml_yields_empty_layer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yaml");
        fs::write(&path, "neuron.axon_port: [unclosed").unwrap();
        let layer = load_file_layer(&path, &declared(&["neuron.axon_port"]));
        assert!(layer.is_empty());
    }

    #[test]
    fn test_non_mapping_document_yields_empty_layer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("list.yaml");
        fs::write(&path, "- a\n- b\n").unwrap();
        let layer = load_file_layer(&path, &declared(&["a"]));
        assert!(layer.is_empty());
    }

    #[test]
    fn test_declared_keys_keep_their_yaml_types() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("defaults.yaml");
        fs::write(
            &path,
            "neuron.axon_port: 9000\nneuron.name: finney\nchain.endpoints: [a, b]\n",
        )
        .unwrap();

        let layer = load_file_layer(
            &path,
            &declared(&["neuron.axon_port", "neuron.name", "chain.endpoints"]),
        );
        assert_eq!(layer.get("neuron.axon_port"), Some(&json!(9000)));
        assert_eq!(layer.get("neuron.name"), Some(&json!("finney")));
        assert_eq!(layer.get("chain.endpoints"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("defaults.yaml");
        fs::write(&path, "neuron.axon_port: 9000\nbogus.key: 1\n").unwrap();

        let layer = load_file_layer(&path, &declared(&["neuron.axon_port"]));
        assert_eq!(layer.len(), 1);
        assert!(layer.contains_key("neuron.axon_port"));
    }

    #[test]
    fn test_expand_home_leaves_plain_paths_alone() {
        let path = PathBuf::from("/tmp/defaults.yaml");
        assert_eq!(expand_home(&path), path);
        let relative = PathBuf::from("defaults.yaml");
        assert_eq!(expand_home(&relative), relative);
    }

    #[test]
    fn test_expand_home_resolves_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/defaults.yaml")),
                home.join("defaults.yaml")
            );
        }
    }
}
