// src/dag/store.rs

//! The task graph store: single source of truth for every in-flight task.
//!
//! All state lives behind one `RwLock`. Every public operation takes the lock
//! for the duration of a single check-and-mutate and releases it before
//! returning, so callers never hold it across an operation boundary.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::compiler::{CompiledExpression, OperandSpec};
use crate::dag::state_manager::StateManager;
use crate::dag::step::ResolutionStep;
use crate::dag::task_info::{LeaseToken, Operand, TaskFailure, TaskId, TaskNode, TaskState};
use crate::dag::StoreError;
use crate::registry::{ExpressionId, ExpressionNode, ExpressionRegistry, ExpressionStatus};

/// Tasks belonging to one non-terminated expression.
#[derive(Debug)]
struct ExpressionTasks {
    root: TaskId,
    members: Vec<TaskId>,
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: HashMap<TaskId, TaskNode>,
    /// Ready tasks, ordered by creation.
    ready: BTreeSet<TaskId>,
    expressions: HashMap<ExpressionId, ExpressionTasks>,
    next_task_id: u64,
}

impl StoreState {
    fn manager(&mut self) -> StateManager<'_> {
        StateManager::new(&mut self.tasks, &mut self.ready)
    }

    /// If the expression's root task is terminal, publish the outcome to the
    /// registry and drop the expression's tasks.
    fn finish_if_terminal(
        &mut self,
        registry: &ExpressionRegistry,
        expression: &ExpressionId,
        step: &mut ResolutionStep,
    ) {
        let Some(root) = self.expressions.get(expression).map(|e| e.root) else {
            return;
        };
        let Some(root_state) = self.tasks.get(&root).map(|n| n.state.clone()) else {
            return;
        };

        match root_state {
            TaskState::Done { value } => {
                registry.complete(expression, value);
                step.expression_finished = Some(ExpressionStatus::Done);
            }
            TaskState::Failed { reason } => {
                registry.fail(expression, self.root_cause(reason));
                step.expression_finished = Some(ExpressionStatus::Failed);
            }
            _ => return,
        }

        self.purge(expression);
    }

    /// Follow an `UpstreamFailure` back to the reason of the originating task.
    fn root_cause(&self, reason: TaskFailure) -> TaskFailure {
        match reason {
            TaskFailure::UpstreamFailure { task } => match self.tasks.get(&task).map(|n| &n.state) {
                Some(TaskState::Failed { reason }) => reason.clone(),
                _ => TaskFailure::UpstreamFailure { task },
            },
            other => other,
        }
    }

    fn purge(&mut self, expression: &ExpressionId) {
        if let Some(entry) = self.expressions.remove(expression) {
            for id in &entry.members {
                self.tasks.remove(id);
                self.ready.remove(id);
            }
            debug!(expression = %expression, tasks = entry.members.len(), "purged tasks of terminated expression");
        }
    }

    /// Fetch a task that must currently hold `token`.
    fn leased_task_mut(&mut self, id: TaskId, token: LeaseToken) -> Result<&mut TaskNode, StoreError> {
        let node = self.tasks.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        let live = matches!(node.state, TaskState::Leased { token: current, .. } if current == token);
        if live {
            Ok(node)
        } else {
            Err(StoreError::StaleLeaseToken(id))
        }
    }
}

/// Upper bound on a single lease.
pub const MAX_LEASE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn lease_deadline(now: Instant, lease_duration: Duration) -> Instant {
    let capped = lease_duration.min(MAX_LEASE);
    now.checked_add(capped).unwrap_or(now)
}

/// Internally synchronized store for tasks of all in-flight expressions.
#[derive(Debug)]
pub struct TaskGraphStore {
    state: RwLock<StoreState>,
    registry: Arc<ExpressionRegistry>,
}

impl TaskGraphStore {
    pub fn new(registry: Arc<ExpressionRegistry>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ExpressionRegistry> {
        &self.registry
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert the tasks of a compiled expression and compute initial
    /// readiness. Returns the new expression's id.
    ///
    /// A bare literal is recorded as `Done` immediately without any task. A
    /// task carrying a compile-time fault starts out `Failed`, which fails the
    /// whole expression before any work is dispatched.
    pub fn register_expression(&self, compiled: &CompiledExpression) -> ExpressionId {
        let expression_id = ExpressionId::new();

        let root_index = match compiled.root {
            OperandSpec::Literal(value) => {
                self.registry
                    .insert(ExpressionNode::resolved(expression_id.clone(), value));
                info!(expression = %expression_id, value, "registered literal expression");
                return expression_id;
            }
            OperandSpec::Task(idx) => idx,
        };

        let mut guard = self.write();
        let state = &mut *guard;

        let base = state.next_task_id;
        state.next_task_id += compiled.tasks.len() as u64;
        let ids: Vec<TaskId> = (0..compiled.tasks.len() as u64)
            .map(|offset| TaskId(base + offset))
            .collect();
        let operand = |spec: OperandSpec| match spec {
            OperandSpec::Literal(v) => Operand::Literal(v),
            OperandSpec::Task(idx) => Operand::TaskRef(ids[idx]),
        };

        let mut nodes: Vec<TaskNode> = compiled
            .tasks
            .iter()
            .enumerate()
            .map(|(idx, spec)| TaskNode {
                id: ids[idx],
                expression_id: expression_id.clone(),
                operation: spec.operator,
                left: operand(spec.left),
                right: operand(spec.right),
                state: TaskState::Blocked,
                dependents: Vec::new(),
                lease_generation: 0,
            })
            .collect();

        for (idx, spec) in compiled.tasks.iter().enumerate() {
            for upstream in [spec.left, spec.right] {
                if let OperandSpec::Task(up) = upstream {
                    nodes[up].dependents.push(ids[idx]);
                }
            }
        }

        let root = ids[root_index];
        self.registry
            .insert(ExpressionNode::pending(expression_id.clone(), root));
        state.expressions.insert(
            expression_id.clone(),
            ExpressionTasks {
                root,
                members: ids.clone(),
            },
        );
        for node in nodes {
            state.tasks.insert(node.id, node);
        }

        let mut step = ResolutionStep::default();
        {
            let mut manager = state.manager();
            for (idx, spec) in compiled.tasks.iter().enumerate() {
                match &spec.fault {
                    Some(fault) => manager.fail_task(ids[idx], fault.clone(), &mut step),
                    None => manager.promote_if_resolved(ids[idx], &mut step),
                }
            }
        }

        info!(
            expression = %expression_id,
            tasks = ids.len(),
            ready = step.newly_ready.len(),
            "registered expression"
        );

        state.finish_if_terminal(&self.registry, &expression_id, &mut step);
        expression_id
    }

    /// The oldest `ready` task, if any. Does not change any state.
    pub fn next_ready_task(&self) -> Option<TaskNode> {
        let state = self.read();
        let id = state.ready.iter().next()?;
        state.tasks.get(id).cloned()
    }

    /// Transition `ready → leased` for `lease_duration` and return the token
    /// the worker must present when reporting.
    pub fn lease_task(&self, id: TaskId, lease_duration: Duration) -> Result<LeaseToken, StoreError> {
        let mut state = self.write();
        let state = &mut *state;

        let node = state.tasks.get_mut(&id).ok_or(StoreError::TaskNotFound(id))?;
        if node.state != TaskState::Ready {
            return Err(StoreError::TaskNotReady {
                task: id,
                state: node.state.name(),
            });
        }

        let token = LeaseToken::new();
        node.state = TaskState::Leased {
            deadline: lease_deadline(Instant::now(), lease_duration),
            token,
        };
        node.lease_generation += 1;
        state.ready.remove(&id);

        debug!(
            task = %id,
            generation = node.lease_generation,
            ?lease_duration,
            "task leased"
        );
        self.registry.mark_processing(&node.expression_id);
        Ok(token)
    }

    /// Record the result of a leased task and propagate it to dependents.
    ///
    /// Fails with [`StoreError::StaleLeaseToken`] if `token` is not the live
    /// lease of `id`.
    pub fn complete_task(&self, id: TaskId, token: LeaseToken, value: f64) -> Result<ResolutionStep, StoreError> {
        let mut guard = self.write();
        let state = &mut *guard;

        let node = state.leased_task_mut(id, token)?;
        node.state = TaskState::Done { value };
        let expression_id = node.expression_id.clone();
        debug!(task = %id, value, "task completed");

        let mut step = ResolutionStep::default();
        state.manager().resolve_dependents(id, value, &mut step);
        state.finish_if_terminal(&self.registry, &expression_id, &mut step);
        Ok(step)
    }

    /// Record a failure reported for a leased task and fail everything that
    /// depends on it.
    ///
    /// `UpstreamFailure` is only ever produced by the cascade; a worker that
    /// reports one is recorded as a `WorkerError`.
    pub fn fail_task(&self, id: TaskId, token: LeaseToken, reason: TaskFailure) -> Result<ResolutionStep, StoreError> {
        let mut guard = self.write();
        let state = &mut *guard;

        let expression_id = state.leased_task_mut(id, token)?.expression_id.clone();
        let reason = match reason {
            TaskFailure::UpstreamFailure { task } => {
                warn!(task = %id, upstream = %task, "worker reported an upstream failure");
                TaskFailure::WorkerError {
                    message: format!("worker reported upstream failure of task {task}"),
                }
            }
            other => other,
        };

        let mut step = ResolutionStep::default();
        state.manager().fail_task(id, reason, &mut step);
        state.finish_if_terminal(&self.registry, &expression_id, &mut step);
        Ok(step)
    }

    /// Put every lease whose deadline is before `now` back into `ready`.
    ///
    /// Works from a snapshot of deadlines and re-checks each task under its
    /// own short write lock, so a task completed in between is left alone.
    /// Returns the ids that were re-queued.
    pub fn reclaim_expired_leases(&self, now: Instant) -> Vec<TaskId> {
        let expired: Vec<(TaskId, LeaseToken)> = {
            let state = self.read();
            state
                .tasks
                .values()
                .filter_map(|node| match node.state {
                    TaskState::Leased { deadline, token } if deadline < now => Some((node.id, token)),
                    _ => None,
                })
                .collect()
        };

        let mut reclaimed = Vec::new();
        for (id, token) in expired {
            let mut guard = self.write();
            let state = &mut *guard;

            let Some(node) = state.tasks.get_mut(&id) else {
                continue;
            };
            match node.state {
                TaskState::Leased { deadline, token: current } if current == token && deadline < now => {
                    node.state = TaskState::Ready;
                    state.ready.insert(id);
                    warn!(task = %id, generation = node.lease_generation, "lease expired; task re-queued");
                    reclaimed.push(id);
                }
                _ => {}
            }
        }

        reclaimed
    }

    /// Snapshot of a single task.
    pub fn task(&self, id: TaskId) -> Option<TaskNode> {
        self.read().tasks.get(&id).cloned()
    }

    /// Snapshot of the tasks of a non-terminated expression, in creation order.
    pub fn tasks_of(&self, expression: &ExpressionId) -> Vec<TaskNode> {
        let state = self.read();
        state
            .expressions
            .get(expression)
            .map(|entry| {
                entry
                    .members
                    .iter()
                    .filter_map(|id| state.tasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn task_count(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn ready_count(&self) -> usize {
        self.read().ready.len()
    }
}
