//! Step function registry and invocation
//!
//! Step functions are host-supplied callables taking `(state, params)` and
//! returning a JSON object to merge into the state. Each one declares at
//! registration whether it runs inline on the run's task or on tokio's
//! blocking pool, so a slow synchronous step never stalls other runs.

use crate::error::{EngineError, Result};
use crate::workflow::types::{Params, StateBag};
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, future::Future, sync::Arc};

/// Non-blocking step function, awaited on the run's own task
#[async_trait]
pub trait StepFunction: Send + Sync {
    async fn call(&self, state: StateBag, params: Params) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> StepFunction for F
where
    F: Fn(StateBag, Params) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, state: StateBag, params: Params) -> anyhow::Result<Value> {
        (self)(state, params).await
    }
}

/// Synchronous step function that may block; always run via `spawn_blocking`
pub trait BlockingStepFunction: Send + Sync {
    fn call(&self, state: &StateBag, params: &Params) -> anyhow::Result<Value>;
}

impl<F> BlockingStepFunction for F
where
    F: Fn(&StateBag, &Params) -> anyhow::Result<Value> + Send + Sync,
{
    fn call(&self, state: &StateBag, params: &Params) -> anyhow::Result<Value> {
        (self)(state, params)
    }
}

/// A registered step function together with its declared execution mode
#[derive(Clone)]
pub enum StepHandler {
    Inline(Arc<dyn StepFunction>),
    Blocking(Arc<dyn BlockingStepFunction>),
}

impl std::fmt::Debug for StepHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepHandler::Inline(_) => f.write_str("Inline"),
            StepHandler::Blocking(_) => f.write_str("Blocking"),
        }
    }
}

/// Mapping from step function names to handlers, supplied by the host
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: HashMap<String, StepHandler>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a non-blocking step function
    pub fn register_inline(&mut self, name: impl Into<String>, step: impl StepFunction + 'static) {
        self.steps
            .insert(name.into(), StepHandler::Inline(Arc::new(step)));
    }

    /// Register a step function that must run on the blocking pool
    pub fn register_blocking(
        &mut self,
        name: impl Into<String>,
        step: impl BlockingStepFunction + 'static,
    ) {
        self.steps
            .insert(name.into(), StepHandler::Blocking(Arc::new(step)));
    }

    /// Get a handler by name
    pub fn get(&self, name: &str) -> Option<&StepHandler> {
        self.steps.get(name)
    }

    /// List all registered names
    pub fn names(&self) -> Vec<&str> {
        self.steps.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Result of asking the invoker to run a step function
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// No step function registered under that name
    Missing,
    /// Keys to merge into the state; empty when the step returned a non-object
    Completed(StateBag),
}

/// Resolves step functions by name and runs them in their declared mode
#[derive(Debug, Clone)]
pub struct StepInvoker {
    registry: Arc<StepRegistry>,
}

impl StepInvoker {
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self { registry }
    }

    /// Invoke `function` with copies of the current state and params
    pub async fn invoke(&self, function: &str, state: &StateBag, params: &Params) -> Result<Invocation> {
        let Some(handler) = self.registry.get(function) else {
            tracing::warn!("⚠️ Step function '{}' is not registered", function);
            return Ok(Invocation::Missing);
        };

        let output = match handler {
            StepHandler::Inline(step) => step.call(state.clone(), params.clone()).await,
            StepHandler::Blocking(step) => {
                let step = Arc::clone(step);
                let state = state.clone();
                let params = params.clone();
                tokio::task::spawn_blocking(move || step.call(&state, &params))
                    .await
                    .map_err(|e| EngineError::StepPanicked {
                        function: function.to_string(),
                        message: e.to_string(),
                    })?
            }
        };

        match output {
            Ok(Value::Object(result)) => Ok(Invocation::Completed(result)),
            Ok(other) => {
                tracing::warn!(
                    "⚠️ Step function '{}' returned a non-object ({}); treating as empty",
                    function,
                    kind_of(&other)
                );
                Ok(Invocation::Completed(StateBag::new()))
            }
            Err(e) => Err(EngineError::StepFailed {
                function: function.to_string(),
                message: format!("{e:#}"),
            }),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::time::Duration;

    async fn double(state: StateBag, _params: Params) -> anyhow::Result<Value> {
        let n = state.get("n").and_then(Value::as_i64).unwrap_or(0);
        Ok(json!({"n": n * 2}))
    }

    async fn scalar(_state: StateBag, _params: Params) -> anyhow::Result<Value> {
        Ok(json!(42))
    }

    fn label(_state: &StateBag, params: &Params) -> anyhow::Result<Value> {
        Ok(json!({"label": params.get("text").cloned().unwrap_or(Value::Null)}))
    }

    fn boom(_state: &StateBag, _params: &Params) -> anyhow::Result<Value> {
        Err(anyhow!("tokenizer exploded"))
    }

    fn panics(_state: &StateBag, _params: &Params) -> anyhow::Result<Value> {
        panic!("worker died")
    }

    fn slow(_state: &StateBag, _params: &Params) -> anyhow::Result<Value> {
        std::thread::sleep(Duration::from_millis(200));
        Ok(json!({"slow": true}))
    }

    fn registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        registry.register_inline("double", double);
        registry.register_inline("scalar", scalar);
        registry.register_blocking("label", label);
        registry.register_blocking("boom", boom);
        registry.register_blocking("panics", panics);
        registry.register_blocking("slow", slow);
        registry
    }

    fn state(value: Value) -> StateBag {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_inline_and_blocking_steps() {
        let invoker = StepInvoker::new(Arc::new(registry()));

        let doubled = invoker
            .invoke("double", &state(json!({"n": 21})), &Params::new())
            .await
            .unwrap();
        assert_eq!(doubled, Invocation::Completed(state(json!({"n": 42}))));

        let params = state(json!({"text": "hello"}));
        let labelled = invoker.invoke("label", &StateBag::new(), &params).await.unwrap();
        assert_eq!(labelled, Invocation::Completed(state(json!({"label": "hello"}))));
    }

    #[tokio::test]
    async fn test_missing_and_non_object_results() {
        let invoker = StepInvoker::new(Arc::new(registry()));

        let missing = invoker.invoke("nope", &StateBag::new(), &Params::new()).await.unwrap();
        assert_eq!(missing, Invocation::Missing);

        let scalar = invoker.invoke("scalar", &StateBag::new(), &Params::new()).await.unwrap();
        assert_eq!(scalar, Invocation::Completed(StateBag::new()));
    }

    #[tokio::test]
    async fn test_step_error_is_reported() {
        let invoker = StepInvoker::new(Arc::new(registry()));

        let err = invoker
            .invoke("boom", &StateBag::new(), &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StepFailed { ref function, .. } if function == "boom"));
        assert_eq!(err.to_string(), "tokenizer exploded");
    }

    #[tokio::test]
    async fn test_blocking_panic_is_contained() {
        let invoker = StepInvoker::new(Arc::new(registry()));

        let err = invoker
            .invoke("panics", &StateBag::new(), &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StepPanicked { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_step_does_not_stall_other_tasks() {
        let invoker = StepInvoker::new(Arc::new(registry()));

        let started = std::time::Instant::now();
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            std::time::Instant::now()
        });
        invoker.invoke("slow", &StateBag::new(), &Params::new()).await.unwrap();
        let ticked_at = ticker.await.unwrap();

        assert!(ticked_at.duration_since(started) < Duration::from_millis(150));
    }
}
