//! Error types for workflow construction and validation.

use thiserror::Error;

/// Errors raised while parsing or validating a workflow.
///
/// All of these are construction-time failures: a workflow that deserializes
/// and validates cleanly cannot produce them again later.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The input was not a JSON array of `{where, what}` pairs.
    #[error("workflow is malformed: {0}")]
    Malformed(String),

    /// An action name is neither a built-in primitive nor a driver method.
    #[error("pair {index}: unknown action '{name}'")]
    UnknownAction { index: usize, name: String },

    /// A `$regex` matcher failed to compile.
    #[error("pair {index}: invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        index: usize,
        pattern: String,
        reason: String,
    },
}
