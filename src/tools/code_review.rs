//! Code-review step functions
//!
//! Small deterministic heuristics over `state.code`, used by the sample
//! code-review graph. The scanning steps are registered as blocking since
//! their cost grows with the size of the submitted code.

use crate::workflow::types::{Params, StateBag};
use serde_json::{json, Value};

/// Lines longer than this are reported as issues
const MAX_LINE_LENGTH: usize = 120;

fn code(state: &StateBag) -> &str {
    state.get("code").and_then(Value::as_str).unwrap_or_default()
}

fn int(state: &StateBag, key: &str) -> i64 {
    state
        .get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

/// Collect function names by splitting the code on `def `
///
/// Every non-empty chunk contributes the text before its first `(`, so a
/// leading chunk that is not a definition is reported as well.
pub fn extract_functions(state: &StateBag, _params: &Params) -> anyhow::Result<Value> {
    let functions: Vec<&str> = code(state)
        .split("def ")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let first_line = chunk.lines().next().unwrap_or_default();
            first_line.split('(').next().unwrap_or_default().trim()
        })
        .collect();

    Ok(json!({
        "functions": functions,
        "quality_score": state.get("quality_score").cloned().unwrap_or(json!(0)),
    }))
}

/// One complexity point per ten lines, never less than one
pub fn check_complexity(state: &StateBag, _params: &Params) -> anyhow::Result<Value> {
    let lines = code(state).lines().count();
    Ok(json!({ "complexity": (lines / 10).max(1) }))
}

/// Flag over-long lines and TODO/FIXME markers
pub fn detect_issues(state: &StateBag, _params: &Params) -> anyhow::Result<Value> {
    let mut issues = Vec::new();

    for (index, line) in code(state).lines().enumerate() {
        let line_no = index + 1;
        if line.chars().count() > MAX_LINE_LENGTH {
            issues.push(json!({"line": line_no, "type": "long_line"}));
        }
        if line.contains("TODO") || line.contains("FIXME") {
            issues.push(json!({"line": line_no, "type": "todo"}));
        }
    }

    Ok(json!({ "num_issues": issues.len(), "issues": issues }))
}

pub async fn suggest_improvements(state: StateBag, _params: Params) -> anyhow::Result<Value> {
    let complexity = int(&state, "complexity");
    let num_issues = int(&state, "num_issues");

    let mut suggestions = Vec::new();
    if complexity > 3 {
        suggestions.push("Consider splitting large functions into smaller ones.");
    }
    if num_issues > 0 {
        suggestions.push("Address TODOs and long lines; add tests.");
    }
    if suggestions.is_empty() {
        suggestions.push("Code style looks OK. Consider adding docstrings.");
    }

    let quality_score = int(&state, "quality_score") + (5 - num_issues).max(1);
    Ok(json!({ "suggestions": suggestions, "quality_score": quality_score }))
}

/// `50 - 5·complexity - 8·issues + current score`, floored at zero
pub async fn compute_quality(state: StateBag, _params: Params) -> anyhow::Result<Value> {
    let penalties = int(&state, "complexity") * 5 + int(&state, "num_issues") * 8;
    let quality = (50 - penalties + int(&state, "quality_score")).max(0);
    Ok(json!({ "quality_score": quality }))
}
