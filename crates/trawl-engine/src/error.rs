//! Error types for the interpreter core.

use thiserror::Error;

use crate::driver::DriverError;
use trawl_types::WorkflowError;

/// Errors surfaced by the engine.
///
/// Only [`EngineError::AlreadyRunning`] and [`EngineError::Workflow`] escape
/// to the caller; everything else is recovered inside the main loop, logged,
/// and turned into an early termination with partial results.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `run` was called while a run was already active.
    #[error("interpreter is already running")]
    AlreadyRunning,

    /// The workflow failed construction-time validation.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// An action still carries an unresolved `{"$param": …}` placeholder.
    #[error("action '{action}' has unresolved parameter '{name}'")]
    UnresolvedParam { action: String, name: String },

    /// An action's arguments do not fit its signature.
    #[error("action '{action}': {reason}")]
    BadArgs { action: String, reason: String },

    /// A driver call failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}
