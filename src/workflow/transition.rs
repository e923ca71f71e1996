//! Transition resolution
//!
//! Turns a node's edge specification and the current state into the next step
//! of the traversal.

use crate::error::{EngineError, Result};
use crate::workflow::condition;
use crate::workflow::types::{EdgeSpec, StateBag};

/// Outcome of resolving an edge specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Continue with the named node
    Next(String),
    /// A rule matched and explicitly asked to stop
    Halt,
    /// No rule matched
    NoMatch,
}

impl Transition {
    /// Target node, if the traversal continues
    pub fn target(&self) -> Option<&str> {
        match self {
            Transition::Next(node) => Some(node),
            Transition::Halt | Transition::NoMatch => None,
        }
    }
}

impl EdgeSpec {
    /// Resolve the transition out of `node`
    ///
    /// Rules are checked in listed order and the first one whose condition
    /// holds wins; its `next` is taken verbatim, so a matched rule without a
    /// target halts. An empty target name also halts.
    pub fn resolve(&self, node: &str, state: &StateBag) -> Result<Transition> {
        match self {
            EdgeSpec::Next(target) => Ok(target_or_halt(Some(target))),
            EdgeSpec::Rules(rules) => Ok(rules
                .iter()
                .find(|rule| condition::evaluate(rule.cond.as_ref(), state))
                .map_or(Transition::NoMatch, |rule| target_or_halt(rule.next.as_deref()))),
            EdgeSpec::Malformed(spec) => Err(EngineError::MalformedEdge {
                node: node.to_string(),
                spec: spec.to_string(),
            }),
        }
    }
}

fn target_or_halt(target: Option<&str>) -> Transition {
    match target {
        Some(name) if !name.is_empty() => Transition::Next(name.to_string()),
        _ => Transition::Halt,
    }
}
