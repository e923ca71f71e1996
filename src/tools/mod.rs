//! Built-in step functions
//!
//! The host process supplies step functions to the engine through a
//! [`StepRegistry`]; this module provides the set the server ships with.

pub mod code_review;

use crate::runtime::invoker::StepRegistry;

/// Registry holding every built-in step function
pub fn builtin_registry() -> StepRegistry {
    let mut registry = StepRegistry::new();

    registry.register_blocking("extract_functions", code_review::extract_functions);
    registry.register_blocking("check_complexity", code_review::check_complexity);
    registry.register_blocking("detect_issues", code_review::detect_issues);
    registry.register_inline("suggest_improvements", code_review::suggest_improvements);
    registry.register_inline("compute_quality", code_review::compute_quality);

    registry
}
