//! Execution engine: run submission, detached execution and queries
//!
//! Owns the graph and run repositories handed to it by the host and the
//! executor that drives individual runs. Runs can be awaited by the caller or
//! detached onto their own tokio task and polled later.

use crate::{
    error::{EngineError, Result},
    runtime::{
        executor::{RunExecutor, RunOptions, RunOutcome},
        invoker::{StepInvoker, StepRegistry},
        run::{RunRecord, RunRepository, RunStatus, Termination},
    },
    workflow::{registry::GraphRepository, types::StateBag},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::task::AbortHandle;

/// Entry point for everything run-related
#[derive(Debug)]
pub struct ExecutionEngine {
    graphs: Arc<GraphRepository>,
    runs: Arc<RunRepository>,
    executor: RunExecutor,
    /// Settings used when a submission does not override them
    defaults: RunOptions,
    /// Abort handles of detached runs still in flight
    tasks: Mutex<HashMap<String, AbortHandle>>,
}

impl ExecutionEngine {
    /// Create an engine over the given repositories and step functions
    pub fn new(
        graphs: Arc<GraphRepository>,
        runs: Arc<RunRepository>,
        steps: Arc<StepRegistry>,
        defaults: RunOptions,
    ) -> Self {
        let executor = RunExecutor::new(StepInvoker::new(steps), Arc::clone(&runs));
        Self {
            graphs,
            runs,
            executor,
            defaults,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn graphs(&self) -> &Arc<GraphRepository> {
        &self.graphs
    }

    pub fn runs(&self) -> &Arc<RunRepository> {
        &self.runs
    }

    pub fn defaults(&self) -> RunOptions {
        self.defaults
    }

    /// Register a pending run of `graph_id` without starting it
    pub fn create_run(&self, graph_id: &str, initial_state: StateBag) -> Result<RunRecord> {
        if self.graphs.get(graph_id).is_none() {
            return Err(EngineError::GraphNotFound(graph_id.to_string()));
        }
        Ok(self.runs.create(graph_id, initial_state))
    }

    /// Execute a pending run on the current task and wait for it
    pub async fn execute(&self, run_id: &str, options: RunOptions) -> Result<RunOutcome> {
        let record = self
            .runs
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))?;
        if record.status != RunStatus::Pending {
            return Err(EngineError::NotPending(run_id.to_string()));
        }

        let Some(graph) = self.graphs.get(&record.graph_id) else {
            // Graph deleted between submission and execution
            let err = EngineError::GraphNotFound(record.graph_id.clone());
            let message = err.to_string();
            self.runs.update(run_id, |record| {
                if record.status.is_terminal() {
                    return;
                }
                record.log.push(format!("Exception during run: {message}"));
                record.error = Some(message.clone());
                record.termination = Some(Termination::Failed);
                record.advance(RunStatus::Failed);
            });
            return Err(err);
        };

        self.executor.run(run_id, &graph, record.state, options).await
    }

    /// Submit and await a run in one call
    pub async fn run_graph(
        &self,
        graph_id: &str,
        initial_state: StateBag,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        let record = self.create_run(graph_id, initial_state)?;
        self.execute(&record.run_id, options).await
    }

    /// Start a pending run on its own task and return immediately
    pub fn spawn_run(self: &Arc<Self>, run_id: &str, options: RunOptions) {
        let engine = Arc::clone(self);
        let id = run_id.to_string();

        // Held across spawn + insert so the task cannot deregister before it is registered
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(async move {
            if let Err(e) = engine.execute(&id, options).await {
                tracing::error!("❌ Detached run {} ended with error: {}", id, e);
            }
            engine
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
        });
        tasks.insert(run_id.to_string(), handle.abort_handle());

        tracing::info!("🔄 Detached run {}", run_id);
    }

    /// Current snapshot of a run
    pub fn run_state(&self, run_id: &str) -> Result<RunRecord> {
        self.runs
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    /// Abort a detached run that is still in flight
    ///
    /// Returns whether a task was aborted. The run record becomes `failed`
    /// once the task is torn down; a run that never got polled is failed here.
    pub fn cancel(&self, run_id: &str) -> Result<bool> {
        let record = self.run_state(run_id)?;
        if record.status.is_terminal() {
            return Ok(false);
        }

        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(run_id);

        let Some(handle) = handle else {
            return Ok(false);
        };

        handle.abort();
        self.runs.update(run_id, |record| {
            if record.status == RunStatus::Pending {
                record.mark_cancelled();
            }
        });

        tracing::info!("🛑 Cancelled run {}", run_id);
        Ok(true)
    }

    /// Number of detached runs still in flight
    pub fn active_tasks(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
