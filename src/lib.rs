//! graphflow: minimal graph workflow runtime
//!
//! A workflow is a directed graph of named nodes. Each node may invoke a
//! registered step function over a shared state bag, and conditional edges pick
//! the next node from the resulting state. Runs are tracked in memory and can be
//! awaited or detached and polled.

// Core configuration and setup
pub mod config;

// Engine error type
pub mod error;

// Graph definition layer - types, conditions, transitions and the graph store
pub mod workflow;

// Runtime execution engine - run records, step invocation and the run loop
pub mod runtime;

// Built-in step functions
pub mod tools;

// HTTP API layer - REST endpoints for graphs and runs
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{EngineError, Result};
pub use runtime::{ExecutionEngine, RunOptions, RunOutcome, RunRecord, RunStatus, StepRegistry};
pub use server::start_server;
pub use workflow::{GraphDefinition, GraphRepository, NodeDefinition, StateBag};
