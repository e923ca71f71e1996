//! Error types for the graph engine
//!
//! Authoring problems (missing nodes, unresolved step functions) are not errors:
//! the executor logs them into the run record and carries on. Everything here is
//! either fatal for a run or a lookup failure at the boundary.

use thiserror::Error;

/// Unified error type for graph, run and step operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// No graph stored under this identifier
    #[error("graph not found: {0}")]
    GraphNotFound(String),

    /// No run stored under this identifier
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// Edge entry that is neither a node reference nor a rule list
    #[error("invalid edge spec for node {node}: {spec}")]
    MalformedEdge { node: String, spec: String },

    /// A step function returned an error
    #[error("{message}")]
    StepFailed { function: String, message: String },

    /// The blocking worker running a step function panicked or was torn down
    #[error("step function '{function}' worker terminated: {message}")]
    StepPanicked { function: String, message: String },

    /// Execution requested for a run that already started or finished
    #[error("run {0} is not pending")]
    NotPending(String),

    /// The task driving the run was dropped before the run finished
    #[error("run {0} was cancelled before completion")]
    Cancelled(String),
}

impl EngineError {
    /// Whether this error reports an unknown identifier rather than a run failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::GraphNotFound(_) | EngineError::RunNotFound(_))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
