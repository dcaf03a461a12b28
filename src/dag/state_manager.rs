// src/dag/state_manager.rs

//! Readiness and failure propagation over the task map.
//!
//! The store owns the maps and the lock; this type performs the actual
//! transitions while the caller holds the write guard.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::dag::step::ResolutionStep;
use crate::dag::task_info::{TaskFailure, TaskId, TaskNode, TaskState};

/// Applies state transitions to a set of tasks and the ready index.
pub struct StateManager<'a> {
    tasks: &'a mut HashMap<TaskId, TaskNode>,
    ready: &'a mut BTreeSet<TaskId>,
}

impl<'a> StateManager<'a> {
    pub fn new(tasks: &'a mut HashMap<TaskId, TaskNode>, ready: &'a mut BTreeSet<TaskId>) -> Self {
        Self { tasks, ready }
    }

    /// Move a `Blocked` task to `Ready` if both operands are values.
    ///
    /// A division whose divisor resolved to zero is failed on the spot
    /// instead of being dispatched.
    pub fn promote_if_resolved(&mut self, id: TaskId, step: &mut ResolutionStep) {
        let Some(node) = self.tasks.get_mut(&id) else {
            warn!(task = %id, "promotion requested for unknown task");
            return;
        };

        if node.state != TaskState::Blocked || node.resolved_operands().is_none() {
            return;
        }

        if node.has_zero_divisor() {
            debug!(task = %id, "divisor resolved to zero; failing task");
            self.fail_task(id, TaskFailure::DivisionByZero, step);
            return;
        }

        node.state = TaskState::Ready;
        self.ready.insert(id);
        step.newly_ready.push(id);
        debug!(task = %id, "operands resolved; marking Ready");
    }

    /// Substitute `value` into every dependent of `completed` and promote the
    /// ones whose other operand is already resolved.
    pub fn resolve_dependents(&mut self, completed: TaskId, value: f64, step: &mut ResolutionStep) {
        let dependents = self
            .tasks
            .get(&completed)
            .map(|n| n.dependents.clone())
            .unwrap_or_default();

        for dep in dependents {
            match self.tasks.get_mut(&dep) {
                Some(node) if node.state == TaskState::Blocked => {
                    if node.substitute(completed, value) {
                        debug!(task = %dep, upstream = %completed, value, "substituted upstream result");
                    }
                }
                Some(node) => {
                    // Only possible if the dependent was already failed by
                    // another branch.
                    debug!(task = %dep, state = node.state.name(), "dependent not blocked; skipping");
                    continue;
                }
                None => {
                    warn!(task = %dep, "dependent missing from task map");
                    continue;
                }
            }
            self.promote_if_resolved(dep, step);
        }
    }

    /// Mark `origin` as failed with `reason` and every transitive dependent
    /// as failed with [`TaskFailure::UpstreamFailure`].
    ///
    /// Tasks that are already terminal are left alone.
    pub fn fail_task(&mut self, origin: TaskId, reason: TaskFailure, step: &mut ResolutionStep) {
        let Some(node) = self.tasks.get_mut(&origin) else {
            warn!(task = %origin, "failure for unknown task");
            return;
        };
        if node.state.is_terminal() {
            return;
        }

        warn!(task = %origin, %reason, "task failed; failing dependents");
        node.state = TaskState::Failed { reason };
        self.ready.remove(&origin);
        step.newly_failed.push(origin);

        let mut stack: Vec<TaskId> = node.dependents.clone();
        while let Some(id) = stack.pop() {
            if let Some(dep) = self.tasks.get_mut(&id) {
                if dep.state.is_terminal() {
                    continue;
                }
                debug!(task = %id, upstream = %origin, "marking dependent Failed due to upstream failure");
                dep.state = TaskState::Failed {
                    reason: TaskFailure::UpstreamFailure { task: origin },
                };
                self.ready.remove(&id);
                step.newly_failed.push(id);
                stack.extend(dep.dependents.iter().copied());
            }
        }
    }
}
