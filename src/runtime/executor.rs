//! Run executor: the per-run state machine
//!
//! Walks a graph from its start node, invoking each node's step function,
//! merging results into the state bag and following edge rules until the
//! graph halts, the step budget runs out or a fatal error occurs. The run
//! record is updated after every step so readers can follow progress.

use crate::{
    error::{EngineError, Result},
    runtime::{
        invoker::{Invocation, StepInvoker},
        run::{RunRepository, RunStatus, Termination},
    },
    workflow::{
        transition::Transition,
        types::{GraphDefinition, StateBag},
    },
};
use std::sync::Arc;

/// Per-run execution settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum node executions before the run is stopped as completed
    pub max_steps: usize,
    /// Whether a failed run is also returned to the caller as `Err`
    pub stop_on_exception: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            stop_on_exception: true,
        }
    }
}

/// Final result of a run that the caller receives
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub termination: Termination,
    pub state: StateBag,
    pub log: Vec<String>,
    pub error: Option<String>,
    /// Nodes executed
    pub steps: usize,
}

/// Working copy of a run's progress, owned by the executing task
struct Trace {
    state: StateBag,
    log: Vec<String>,
    steps: usize,
}

/// Drives single runs of a graph
///
/// Holds the step invoker and the run repository it reports into. One
/// executor serves any number of concurrent runs; each call to [`run`]
/// touches only its own run record.
///
/// [`run`]: RunExecutor::run
#[derive(Debug, Clone)]
pub struct RunExecutor {
    invoker: StepInvoker,
    runs: Arc<RunRepository>,
}

impl RunExecutor {
    pub fn new(invoker: StepInvoker, runs: Arc<RunRepository>) -> Self {
        Self { invoker, runs }
    }

    /// Execute `graph` for the pending run `run_id`
    ///
    /// A run that is no longer pending is refused with [`EngineError::NotPending`].
    /// The run record always reaches a terminal status before this returns.
    /// A fatal error is returned as `Err` only when `stop_on_exception` is set;
    /// otherwise it comes back as a failed [`RunOutcome`].
    pub async fn run(
        &self,
        run_id: &str,
        graph: &GraphDefinition,
        initial_state: StateBag,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        let mut trace = Trace {
            state: initial_state,
            log: Vec::new(),
            steps: 0,
        };

        // Only a pending record is claimed; anything else is left untouched
        let started = self.runs.update(run_id, |record| {
            if !record.advance(RunStatus::Running) {
                return false;
            }
            record.state = trace.state.clone();
            record.log.clear();
            true
        });
        match started {
            None => return Err(EngineError::RunNotFound(run_id.to_string())),
            Some(false) => return Err(EngineError::NotPending(run_id.to_string())),
            Some(true) => {}
        }

        let mut guard = CancelGuard::new(Arc::clone(&self.runs), run_id);
        tracing::info!("🚀 Starting run {} on graph {} from node '{}'", run_id, graph.graph_id, graph.start_node);
        let run_start_time = std::time::Instant::now();

        let result = self.drive(run_id, graph, &mut trace, options.max_steps).await;
        guard.disarm();

        match result {
            Ok(termination) => {
                self.runs.update(run_id, |record| {
                    record.state = trace.state.clone();
                    record.log = trace.log.clone();
                    record.steps = trace.steps;
                    record.termination = Some(termination);
                    record.advance(RunStatus::Completed);
                });

                tracing::info!(
                    "🎉 Run {} completed ({:?}) after {} steps in {:?}",
                    run_id,
                    termination,
                    trace.steps,
                    run_start_time.elapsed()
                );

                Ok(RunOutcome {
                    run_id: run_id.to_string(),
                    status: RunStatus::Completed,
                    termination,
                    state: trace.state,
                    log: trace.log,
                    error: None,
                    steps: trace.steps,
                })
            }
            Err(err) => {
                let message = err.to_string();
                trace.log.push(format!("Exception during run: {message}"));

                // State stays at the last snapshot: the failing step merged nothing.
                self.runs.update(run_id, |record| {
                    record.log = trace.log.clone();
                    record.steps = trace.steps;
                    record.error = Some(message.clone());
                    record.termination = Some(Termination::Failed);
                    record.advance(RunStatus::Failed);
                });

                tracing::error!(
                    "❌ Run {} failed after {} steps in {:?} - Error: {}",
                    run_id,
                    trace.steps,
                    run_start_time.elapsed(),
                    message
                );

                if options.stop_on_exception {
                    return Err(err);
                }

                Ok(RunOutcome {
                    run_id: run_id.to_string(),
                    status: RunStatus::Failed,
                    termination: Termination::Failed,
                    state: trace.state,
                    log: trace.log,
                    error: Some(message),
                    steps: trace.steps,
                })
            }
        }
    }

    /// The traversal loop; returns how the run stopped or the fatal error
    async fn drive(
        &self,
        run_id: &str,
        graph: &GraphDefinition,
        trace: &mut Trace,
        max_steps: usize,
    ) -> Result<Termination> {
        let mut current = graph.start_node.clone();
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            if attempts > max_steps {
                trace.log.push(format!("Max steps {max_steps} reached; aborting."));
                tracing::warn!("⏸️ Run {} hit the step budget of {} at node '{}'", run_id, max_steps, current);
                return Ok(Termination::StepBudgetExhausted);
            }

            let Some(node) = graph.node(&current) else {
                trace.log.push(format!("Node '{current}' not found. Stopping."));
                tracing::warn!("⚠️ Run {} reached undefined node '{}'", run_id, current);
                return Ok(Termination::Halted);
            };
            trace.steps += 1;

            match node.func.as_deref() {
                None => {
                    trace.log.push(format!("Node '{current}' has no func; skipping."));
                }
                Some(function) => {
                    tracing::debug!(
                        "📍 Step {}: node '{}' -> function '{}' with params {}",
                        trace.steps,
                        current,
                        function,
                        serde_json::to_string(&node.params).unwrap_or_else(|_| "invalid_json".to_string())
                    );

                    match self.invoker.invoke(function, &trace.state, &node.params).await {
                        Ok(Invocation::Missing) => {
                            trace
                                .log
                                .push(format!("Function '{function}' not found in registry. Skipping."));
                        }
                        Ok(Invocation::Completed(result)) => {
                            let keys: Vec<&str> = result.keys().map(String::as_str).collect();
                            trace.log.push(format!(
                                "Node '{current}' -> function '{function}' result keys: [{}]",
                                keys.join(", ")
                            ));
                            trace.state.extend(result);
                        }
                        Err(e) => {
                            tracing::error!("❌ Node '{}' failed in run {}: {}", current, run_id, e);
                            return Err(e);
                        }
                    }
                }
            }

            self.snapshot(run_id, trace);

            let Some(edge) = graph.edge(&current) else {
                tracing::debug!("🏁 Node '{}' has no outgoing edge; run {} halts", current, run_id);
                return Ok(Termination::Halted);
            };

            let transition = edge.resolve(&current, &trace.state)?;
            if transition.target() == Some(current.as_str()) {
                trace.log.push(format!(
                    "Node '{current}' loops to itself; check condition to avoid infinite loops."
                ));
                tracing::warn!("🔁 Node '{}' loops to itself in run {}", current, run_id);
            }

            let next = match transition {
                Transition::Next(next) => next,
                Transition::Halt | Transition::NoMatch => {
                    tracing::debug!("🏁 Run {} halts after node '{}' ({:?})", run_id, current, transition);
                    return Ok(Termination::Halted);
                }
            };

            trace.log.push(format!("Transition: {current} -> {next}"));
            current = next;

            tokio::task::yield_now().await;
        }
    }

    /// Publish the working state and log so readers see progress
    fn snapshot(&self, run_id: &str, trace: &Trace) {
        self.runs.update(run_id, |record| {
            record.state = trace.state.clone();
            record.log = trace.log.clone();
            record.steps = trace.steps;
        });
    }
}

/// Leaves the run record terminal if the executing future is dropped mid-run
struct CancelGuard {
    runs: Arc<RunRepository>,
    run_id: String,
    armed: bool,
}

impl CancelGuard {
    fn new(runs: Arc<RunRepository>, run_id: &str) -> Self {
        Self {
            runs,
            run_id: run_id.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("🛑 Run {} dropped before completion", self.run_id);
            self.runs.update(&self.run_id, |record| record.mark_cancelled());
        }
    }
}
