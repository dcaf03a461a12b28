// src/engine/dispatcher.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compiler::{compile, CompileError, Operator};
use crate::config::{ConfigFile, OperationTimes};
use crate::dag::{LeaseToken, ResolutionStep, StoreError, TaskFailure, TaskGraphStore, TaskId};
use crate::registry::{ExpressionId, ExpressionNode, ExpressionRegistry};

/// Lease sizing and per-operator cost, passed in as plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Lower bound for every lease.
    pub lease_duration: Duration,
    /// A lease lasts at least `operation_time * lease_multiplier`.
    pub lease_multiplier: u32,
    pub operation_times: OperationTimes,
}

impl DispatchSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            lease_duration: cfg.orchestrator.lease_duration,
            lease_multiplier: cfg.orchestrator.lease_multiplier,
            operation_times: cfg.operations,
        }
    }

    /// Lease granted for a task of the given operator.
    pub fn lease_for(&self, op: Operator) -> Duration {
        let scaled = self
            .operation_times
            .for_operator(op)
            .saturating_mul(self.lease_multiplier);
        self.lease_duration.max(scaled)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            lease_duration: Duration::from_secs(5),
            lease_multiplier: 3,
            operation_times: OperationTimes::default(),
        }
    }
}

/// What a worker receives for one leased task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskAssignment {
    pub id: TaskId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operator,
    /// Simulated cost the worker should spend before reporting.
    pub operation_time: Duration,
    pub lease_token: LeaseToken,
}

/// How a worker report was handled.
///
/// `Discarded` is not an error: the lease was superseded by a re-dispatch, or
/// the expression already terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOutcome {
    Accepted,
    Discarded,
}

/// Worker- and client-facing front of the core.
///
/// Owns the store and the registry; the HTTP layer, the lease sweeper and
/// in-process workers all share one `Arc<Dispatcher>`.
#[derive(Debug)]
pub struct Dispatcher {
    store: TaskGraphStore,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(settings: DispatchSettings) -> Self {
        let registry = Arc::new(ExpressionRegistry::new());
        Self {
            store: TaskGraphStore::new(registry),
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn store(&self) -> &TaskGraphStore {
        &self.store
    }

    pub fn registry(&self) -> &ExpressionRegistry {
        self.store.registry()
    }

    /// Compile `input` and register its tasks. On error nothing is created.
    pub fn submit(&self, input: &str) -> Result<ExpressionId, CompileError> {
        let compiled = compile(input).inspect_err(|err| {
            debug!(%err, "rejected expression");
        })?;
        let id = self.store.register_expression(&compiled);
        info!(expression = %id, tasks = compiled.task_count(), "expression submitted");
        Ok(id)
    }

    /// Lease the oldest ready task, or `None` when nothing is ready.
    ///
    /// Another worker may lease the same task between the lookup and the
    /// lease; in that case the next ready task is tried.
    pub fn request_task(&self) -> Option<TaskAssignment> {
        loop {
            let node = self.store.next_ready_task()?;
            let Some((arg1, arg2)) = node.resolved_operands() else {
                warn!(task = %node.id, "ready task has unresolved operands");
                return None;
            };

            let lease = self.settings.lease_for(node.operation);
            match self.store.lease_task(node.id, lease) {
                Ok(lease_token) => {
                    return Some(TaskAssignment {
                        id: node.id,
                        arg1,
                        arg2,
                        operation: node.operation,
                        operation_time: self.settings.operation_times.for_operator(node.operation),
                        lease_token,
                    });
                }
                Err(err) => {
                    debug!(task = %node.id, %err, "lost lease race; retrying");
                }
            }
        }
    }

    /// Report a computed value for a leased task.
    pub fn report_result(&self, id: TaskId, token: LeaseToken, value: f64) -> ReportOutcome {
        Self::outcome(id, self.store.complete_task(id, token, value))
    }

    /// Report that a leased task could not be computed.
    pub fn report_failure(&self, id: TaskId, token: LeaseToken, reason: TaskFailure) -> ReportOutcome {
        Self::outcome(id, self.store.fail_task(id, token, reason))
    }

    fn outcome(id: TaskId, result: Result<ResolutionStep, StoreError>) -> ReportOutcome {
        match result {
            Ok(step) => {
                debug!(
                    task = %id,
                    newly_ready = step.newly_ready.len(),
                    newly_failed = step.newly_failed.len(),
                    finished = ?step.expression_finished,
                    "report accepted"
                );
                ReportOutcome::Accepted
            }
            Err(err) => {
                debug!(task = %id, %err, "report discarded");
                ReportOutcome::Discarded
            }
        }
    }

    /// Re-queue every lease that expired before now.
    pub fn reclaim_expired(&self) -> Vec<TaskId> {
        self.store.reclaim_expired_leases(Instant::now())
    }

    pub fn lookup(&self, id: &ExpressionId) -> Option<ExpressionNode> {
        self.registry().lookup(id)
    }

    pub fn list_expressions(&self) -> Vec<ExpressionNode> {
        self.registry().list_all()
    }
}
