//! Condition evaluation against the state bag
//!
//! Pure and total: a condition that cannot be evaluated is false, never an error.

use crate::workflow::types::{Condition, Operator, StateBag};
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluate an optional rule condition; an absent condition always holds
pub fn evaluate(condition: Option<&Condition>, state: &StateBag) -> bool {
    condition.map_or(true, |cond| cond.evaluate(state))
}

impl Condition {
    /// Evaluate this condition against the current state
    ///
    /// `eq`/`neq` treat a missing key as `null`. Ordering operators are false for
    /// a missing or null value and for values of different kinds.
    pub fn evaluate(&self, state: &StateBag) -> bool {
        let actual = state.get(&self.key);

        match self.op {
            Operator::Eq => loosely_equal(actual.unwrap_or(&Value::Null), &self.value),
            Operator::Neq => !loosely_equal(actual.unwrap_or(&Value::Null), &self.value),
            Operator::Gt => ordered(actual, &self.value, Ordering::is_gt),
            Operator::Lt => ordered(actual, &self.value, Ordering::is_lt),
            Operator::Ge => ordered(actual, &self.value, Ordering::is_ge),
            Operator::Le => ordered(actual, &self.value, Ordering::is_le),
            Operator::Unknown => false,
        }
    }
}

fn ordered(actual: Option<&Value>, literal: &Value, accept: fn(Ordering) -> bool) -> bool {
    match actual {
        None | Some(Value::Null) => false,
        Some(value) => compare(value, literal).is_some_and(accept),
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`)
fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => compare(left, right) == Some(Ordering::Equal),
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| loosely_equal(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(key, a)| r.get(key).is_some_and(|b| loosely_equal(a, b)))
        }
        _ => left == right,
    }
}

/// Ordering between two values of the same kind, `None` when they are not comparable
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => l.as_f64()?.partial_cmp(&r.as_f64()?),
        },
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Array(l), Value::Array(r)) => {
            for (a, b) in l.iter().zip(r) {
                match compare(a, b)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(l.len().cmp(&r.len()))
        }
        _ => None,
    }
}
