//! Graph Definition Layer
//!
//! This module handles graph definitions and everything needed to walk them:
//! - Type definitions (GraphDefinition, NodeDefinition, EdgeSpec, Condition)
//! - Condition evaluation and transition resolution
//! - Lock-free graph repository using ArcSwap
//! - Sample graphs built on the bundled tools

// Core graph type definitions
pub mod types;

// Pure predicate evaluation against the state bag
pub mod condition;

// Edge spec → next node / halt
pub mod transition;

// In-memory graph store
pub mod registry;

// Pre-built graphs
pub mod samples;

// Re-export commonly used types
pub use registry::GraphRepository;
pub use transition::Transition;
pub use types::{
    Condition, EdgeRule, EdgeSpec, GraphCreateRequest, GraphDefinition, NodeDefinition, Operator,
    Params, StateBag,
};
