//! Error types for configuration merging.

use thiserror::Error;

/// Errors surfaced by the merge pipeline.
///
/// Non-fatal conditions (a missing or malformed defaults file, unknown keys
/// in the file) never reach this type; they are reported via `tracing` and
/// resolution continues with built-in defaults.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The final parse of the raw arguments failed. In strict mode this
    /// includes any token the spec does not recognize.
    #[error("invalid arguments: {0}")]
    Parse(#[from] clap::Error),

    /// A dotted key required an intermediate tree node at a path segment
    /// that is already bound to a scalar, or vice versa (for example both
    /// `--neuron` and `--neuron.axon_port` resolving to values).
    #[error("configuration path '{path}' is bound to both a scalar and a nested tree")]
    PathConflict {
        /// The dotted key whose insertion or merge collided.
        path: String,
    },
}

impl MergeError {
    pub(crate) fn path_conflict(path: impl Into<String>) -> Self {
        MergeError::PathConflict { path: path.into() }
    }
}
