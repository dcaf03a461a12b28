// src/dag/task_info.rs

//! Task nodes, their operands and per-task state.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::Operator;
use crate::registry::ExpressionId;

/// Unique task identifier.
///
/// Ids are handed out from a monotonically increasing counter, so ordering by
/// id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticates a worker's report against the lease it was granted.
///
/// A fresh token is minted for every lease, so a token from an expired or
/// superseded lease never matches again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseToken(pub uuid::Uuid);

impl LeaseToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for LeaseToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a task ended up `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskFailure {
    #[error("division by zero")]
    DivisionByZero,

    /// An operand depended on a task that failed. `task` is the task where
    /// the failure originated.
    #[error("upstream task {task} failed")]
    UpstreamFailure { task: TaskId },

    /// Any other failure reported by a worker.
    #[error("worker error: {message}")]
    WorkerError { message: String },
}

/// Task operand: either a concrete value or a reference to another task.
///
/// A `TaskRef` is replaced by `Literal` in place when the referenced task
/// completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    TaskRef(TaskId),
}

impl Operand {
    pub fn value(&self) -> Option<f64> {
        match self {
            Operand::Literal(v) => Some(*v),
            Operand::TaskRef(_) => None,
        }
    }
}

/// Per-task state.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// At least one operand is an unresolved `TaskRef`.
    Blocked,
    /// Both operands are values; waiting for a worker.
    Ready,
    /// Handed to a worker until `deadline`.
    Leased {
        deadline: Instant,
        token: LeaseToken,
    },
    Done {
        value: f64,
    },
    Failed {
        reason: TaskFailure,
    },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done { .. } | TaskState::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Blocked => "blocked",
            TaskState::Ready => "ready",
            TaskState::Leased { .. } => "leased",
            TaskState::Done { .. } => "done",
            TaskState::Failed { .. } => "failed",
        }
    }
}

/// A single binary operation in the store.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    pub operation: Operator,
    pub left: Operand,
    pub right: Operand,
    pub state: TaskState,
    /// Tasks that use this task's result as an operand.
    pub dependents: Vec<TaskId>,
    /// Number of leases granted so far.
    pub lease_generation: u64,
}

impl TaskNode {
    /// Both operand values, once neither is a `TaskRef`.
    pub fn resolved_operands(&self) -> Option<(f64, f64)> {
        Some((self.left.value()?, self.right.value()?))
    }

    pub fn has_zero_divisor(&self) -> bool {
        self.operation == Operator::Divide && self.right.value() == Some(0.0)
    }

    /// Replace every `TaskRef(upstream)` operand with `value`.
    pub(crate) fn substitute(&mut self, upstream: TaskId, value: f64) -> bool {
        let mut replaced = false;
        for slot in [&mut self.left, &mut self.right] {
            if *slot == Operand::TaskRef(upstream) {
                *slot = Operand::Literal(value);
                replaced = true;
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(left: Operand, right: Operand, operation: Operator) -> TaskNode {
        TaskNode {
            id: TaskId(1),
            expression_id: ExpressionId::new(),
            operation,
            left,
            right,
            state: TaskState::Blocked,
            dependents: Vec::new(),
            lease_generation: 0,
        }
    }

    #[test]
    fn substitution_resolves_matching_slot_only() {
        let mut n = node(
            Operand::TaskRef(TaskId(0)),
            Operand::TaskRef(TaskId(5)),
            Operator::Add,
        );
        assert!(n.substitute(TaskId(0), 2.5));
        assert_eq!(n.left, Operand::Literal(2.5));
        assert_eq!(n.right, Operand::TaskRef(TaskId(5)));
        assert_eq!(n.resolved_operands(), None);

        assert!(!n.substitute(TaskId(9), 1.0));
        assert!(n.substitute(TaskId(5), 4.0));
        assert_eq!(n.resolved_operands(), Some((2.5, 4.0)));
    }

    #[test]
    fn zero_divisor_detection() {
        let n = node(Operand::Literal(1.0), Operand::Literal(0.0), Operator::Divide);
        assert!(n.has_zero_divisor());
        let n = node(Operand::Literal(0.0), Operand::Literal(1.0), Operator::Divide);
        assert!(!n.has_zero_divisor());
        let n = node(Operand::Literal(1.0), Operand::Literal(0.0), Operator::Multiply);
        assert!(!n.has_zero_divisor());
    }

    #[test]
    fn failure_serializes_with_kind_tag() {
        let json = serde_json::to_value(TaskFailure::UpstreamFailure { task: TaskId(3) }).unwrap();
        assert_eq!(json["kind"], "upstream_failure");
        assert_eq!(json["task"], 3);

        let parsed: TaskFailure = serde_json::from_str(r#"{"kind":"division_by_zero"}"#).unwrap();
        assert_eq!(parsed, TaskFailure::DivisionByZero);
    }
}
