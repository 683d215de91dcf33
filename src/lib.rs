//! Layered command-line configuration merging.
//!
//! Consolidates a caller-supplied argument spec (`clap::Command`), an
//! optional YAML defaults file, and dotted-key namespaces into one nested
//! [`ConfigTree`], merging three tiers lowest to highest:
//!
//! 1. **Built-in defaults** - declared on the spec itself
//! 2. **File defaults** - `--config <path>`, a flat mapping of dotted
//!    argument names to values, with leading `~` expanded to the home
//!    directory
//! 3. **Command line** - values explicitly supplied by the caller
//!
//! Every key sourced from tier 2 or 3 is recorded in the tree's reserved
//! `__is_set` entry, so callers can tell an explicit value from an
//! inherited default even when the two are equal.
//!
//! ## Strictness
//! `--strict` (or [`Merger::strict`]) makes any token the spec does not
//! declare a fatal parse error; without it unrecognized tokens are ignored.
//!
//! ## Failure model
//! A missing, unreadable, or malformed defaults file is reported and
//! skipped; built-in defaults remain in effect. Only strict-mode parse
//! failures and scalar/tree path conflicts abort resolution.

pub mod error;
pub mod loader;
pub mod merge;
pub mod spec;
pub mod tree;

mod defaults;

pub use error::MergeError;
pub use loader::Merger;
pub use merge::{deep_merge, deep_merge_all};
pub use spec::ArgSpec;
pub use tree::{ConfigTree, ConfigValue, IS_SET_KEY};
