//! Pre-built sample graphs
//!
//! The code-review graph wires the built-in tools from [`crate::tools`]:
//! extract → complexity → detect → suggest → quality, looping back to suggest
//! until the quality score reaches the threshold.

use crate::workflow::{
    registry::GraphRepository,
    types::{Condition, EdgeRule, EdgeSpec, GraphDefinition, NodeDefinition, Operator, Params},
};
use serde_json::json;
use std::collections::HashMap;

/// Build the code-review graph under a fresh identifier
pub fn build_code_review_graph(threshold: i64) -> GraphDefinition {
    let mut quality_params = Params::new();
    quality_params.insert("threshold".to_string(), json!(threshold));

    let nodes = vec![
        NodeDefinition::step("extract", "extract_functions"),
        NodeDefinition::step("complexity", "check_complexity"),
        NodeDefinition::step("detect", "detect_issues"),
        NodeDefinition::step("suggest", "suggest_improvements"),
        NodeDefinition::step("quality", "compute_quality").with_params(quality_params),
    ];

    let edges = HashMap::from([
        ("extract".to_string(), EdgeSpec::Next("complexity".to_string())),
        ("complexity".to_string(), EdgeSpec::Next("detect".to_string())),
        ("detect".to_string(), EdgeSpec::Next("suggest".to_string())),
        ("suggest".to_string(), EdgeSpec::Next("quality".to_string())),
        (
            "quality".to_string(),
            EdgeSpec::Rules(vec![
                EdgeRule::when(
                    Condition::new("quality_score", Operator::Ge, json!(threshold)),
                    None,
                ),
                EdgeRule::otherwise(Some("suggest")),
            ]),
        ),
    ]);

    GraphDefinition::new(
        GraphRepository::new_graph_id(),
        nodes,
        edges,
        "extract".to_string(),
    )
}
