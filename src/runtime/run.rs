//! Run records and the run repository
//!
//! Every run owns exactly one record. The executor driving the run is the only
//! writer; API readers take cloned snapshots at any time.

use crate::error::EngineError;
use crate::workflow::types::StateBag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};
use uuid::Uuid;

/// Lifecycle status of a run
///
/// Only moves forward: pending → running → {completed, failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    fn rank(self) -> u8 {
        match self {
            RunStatus::Pending => 0,
            RunStatus::Running => 1,
            RunStatus::Completed | RunStatus::Failed => 2,
        }
    }

    /// Whether the run has finished, successfully or not
    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_advance_to(self, next: RunStatus) -> bool {
        next.rank() > self.rank()
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Terminal node, explicit halt, unmatched rules or a missing node
    Halted,
    /// The step budget ran out; the run still counts as completed
    StepBudgetExhausted,
    /// A fatal error stopped the run
    Failed,
    /// The task driving the run was torn down
    Cancelled,
}

/// Snapshot of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub graph_id: String,
    /// State as of the last completed step
    pub state: StateBag,
    /// Human-readable trace, in execution order
    pub log: Vec<String>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub termination: Option<Termination>,
    /// Node executions attempted so far
    pub steps: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    /// Fresh pending record holding the initial state
    pub fn new(run_id: String, graph_id: String, initial_state: StateBag) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            graph_id,
            state: initial_state,
            log: Vec::new(),
            status: RunStatus::Pending,
            error: None,
            termination: None,
            steps: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next` if that keeps the lifecycle monotonic
    ///
    /// Returns false, leaving the record untouched, on an attempted regression.
    pub fn advance(&mut self, next: RunStatus) -> bool {
        if !self.status.can_advance_to(next) {
            tracing::warn!(
                "⚠️ Refusing status change {:?} -> {:?} for run {}",
                self.status,
                next,
                self.run_id
            );
            return false;
        }
        self.status = next;
        true
    }

    /// Fail a run whose driving task went away; no-op once terminal
    pub fn mark_cancelled(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.log.push("Run cancelled before completion.".to_string());
        self.error = Some(EngineError::Cancelled(self.run_id.clone()).to_string());
        self.termination = Some(Termination::Cancelled);
        self.advance(RunStatus::Failed);
    }
}

/// Keyed store of run records
///
/// The outer map lock is only held to insert or look up an entry; each record
/// has its own lock so concurrent runs never contend on each other's updates.
/// No lock is ever held across an `.await`.
#[derive(Debug, Default)]
pub struct RunRepository {
    runs: RwLock<HashMap<String, Arc<Mutex<RunRecord>>>>,
}

impl RunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh opaque run identifier
    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Create a pending run record and return a snapshot of it
    pub fn create(&self, graph_id: &str, initial_state: StateBag) -> RunRecord {
        let record = RunRecord::new(Self::new_run_id(), graph_id.to_string(), initial_state);
        let snapshot = record.clone();

        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.run_id.clone(), Arc::new(Mutex::new(record)));

        tracing::debug!("📋 Created pending run {} for graph {}", snapshot.run_id, graph_id);
        snapshot
    }

    /// Current snapshot of a run
    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        let entry = self.entry(run_id)?;
        let record = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(record.clone())
    }

    /// Apply `f` to a run's record, stamping `updated_at`
    ///
    /// Returns `None` when the run does not exist.
    pub fn update<R>(&self, run_id: &str, f: impl FnOnce(&mut RunRecord) -> R) -> Option<R> {
        let entry = self.entry(run_id)?;
        let mut record = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut *record);
        record.updated_at = Utc::now();
        Some(result)
    }

    pub fn contains(&self, run_id: &str) -> bool {
        self.entry(run_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, run_id: &str) -> Option<Arc<Mutex<RunRecord>>> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(run_id)
            .cloned()
    }
}
