//! Runtime Execution Engine
//!
//! This module drives graph runs. It handles:
//! - Run records and their monotonic lifecycle
//! - Step function registration and invocation (inline or blocking)
//! - The per-run state machine with step budget and self-loop detection
//! - Synchronous and detached execution on tokio tasks

// Run records and the run repository
pub mod run;

// Step function registry and invocation
pub mod invoker;

// Per-run state machine
pub mod executor;

// Submission, detached execution and queries
pub mod engine;

// Re-export main types
pub use engine::ExecutionEngine;
pub use executor::{RunExecutor, RunOptions, RunOutcome};
pub use invoker::{BlockingStepFunction, StepFunction, StepHandler, StepInvoker, StepRegistry};
pub use run::{RunRecord, RunRepository, RunStatus, Termination};
