// src/exec/compute.rs

//! Arithmetic of a single task, as performed by a worker.

use crate::compiler::Operator;
use crate::dag::{LeaseToken, TaskFailure, TaskId};
use crate::engine::TaskAssignment;

/// A worker's answer for one leased task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub id: TaskId,
    pub lease_token: LeaseToken,
    pub outcome: Result<f64, TaskFailure>,
}

/// Apply `op` to `(a, b)`.
///
/// A zero divisor is `DivisionByZero`. Results that overflow to infinity
/// cannot be carried as JSON numbers and are reported as worker errors.
pub fn evaluate(op: Operator, a: f64, b: f64) -> Result<f64, TaskFailure> {
    let value = match op {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => {
            if b == 0.0 {
                return Err(TaskFailure::DivisionByZero);
            }
            a / b
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(TaskFailure::WorkerError {
            message: format!("{a} {op} {b} is not a finite number"),
        })
    }
}

/// Compute the report for an assignment (without the simulated delay).
pub fn execute(task: &TaskAssignment) -> TaskReport {
    TaskReport {
        id: task.id,
        lease_token: task.lease_token,
        outcome: evaluate(task.operation, task.arg1, task.arg2),
    }
}
