//! The config merger pipeline.
//!
//! Resolves a caller-supplied argument spec against raw tokens and an
//! optional YAML defaults file, as three explicit layers merged lowest to
//! highest:
//!
//! 1. **Built-in defaults** - declared on the spec itself
//! 2. **File defaults** - flat dotted-key YAML named by `--config`
//! 3. **Command line** - values explicitly supplied by the caller
//!
//! The result is a nested [`ConfigTree`] whose reserved `__is_set` entry
//! records every key sourced from tier 2 or 3. The caller's `clap::Command`
//! is never mutated; every pass parses a clone.

use crate::defaults;
use crate::error::MergeError;
use crate::merge::deep_merge_all;
use crate::spec::{self, ArgSpec};
use crate::tree::ConfigTree;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Builder for a single merge invocation.
///
/// # Example
/// ```
/// use argmerge::Merger;
/// use clap::{Arg, Command};
///
/// let command = Command::new("neuron").arg(
///     Arg::new("neuron.axon_port")
///         .long("neuron.axon_port")
///         .default_value("8091"),
/// );
/// let tree = Merger::new(command)
///     .merge_from(["--neuron.axon_port", "9000"])
///     .unwrap();
///
/// assert_eq!(tree.get_path("neuron.axon_port").unwrap().as_i64(), Some(9000));
/// assert!(tree.is_set("neuron.axon_port"));
/// ```
#[derive(Debug, Clone)]
pub struct Merger {
    spec: ArgSpec,
    strict: bool,
}

impl Merger {
    /// Wrap an argument spec. `--config` and `--strict` are added to it
    /// unless already declared.
    pub fn new(command: clap::Command) -> Self {
        Self {
            spec: ArgSpec::new(command),
            strict: false,
        }
    }

    /// Force strict parsing regardless of whether `--strict` appears in the
    /// arguments.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Merge against the process's own invocation arguments.
    pub fn merge(self) -> Result<ConfigTree, MergeError> {
        let args: Vec<OsString> = std::env::args_os().skip(1).collect();
        self.run(args)
    }

    /// Merge against an explicit token list (no binary name).
    pub fn merge_from<I, T>(self, args: I) -> Result<ConfigTree, MergeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        self.run(args)
    }

    fn run(self, args: Vec<OsString>) -> Result<ConfigTree, MergeError> {
        // Discovery pass: one lenient parse yields both the defaults file
        // path and the --strict flag. Failures mean "no file, not strict".
        let (config_path, strict_flag) = match self.spec.parse(&args, false) {
            Ok(matches) => (
                spec::raw_string(&matches, "config").map(PathBuf::from),
                spec::flag_is_true(&matches, "strict"),
            ),
            Err(_) => (None, false),
        };

        // Effective strictness is the caller flag OR --strict.
        let strict = self.strict || strict_flag;

        // File defaults layer, filtered to keys the spec declares.
        let file_layer = match &config_path {
            Some(path) => defaults::load_file_layer(path, self.spec.declared_keys()),
            None => BTreeMap::new(),
        };

        // Final pass. Strict-mode violations are fatal here.
        let matches = self.spec.parse(&args, strict)?;
        let layers = self.spec.extract_layers(&matches);

        // Unflatten each layer and merge defaults < file < command line.
        let mut tree = deep_merge_all([
            ConfigTree::from_flat(layers.defaults)?,
            ConfigTree::from_flat(file_layer.clone())?,
            ConfigTree::from_flat(layers.cli.clone())?,
        ])?;

        // Everything sourced from the file or the command line was
        // explicitly set; keys resolved from built-in defaults were not.
        let provenance: Vec<String> =
            file_layer.into_keys().chain(layers.cli.into_keys()).collect();
        tree.set_provenance(provenance);

        Ok(tree)
    }
}
