// src/dag/step.rs

//! Result type for a single store mutation.

use crate::dag::task_info::TaskId;
use crate::registry::ExpressionStatus;

/// Structured result of one store "step" (registration, completion or
/// failure).
///
/// Useful for tests that want to make assertions about exactly what changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionStep {
    /// Tasks that became `ready` as a result of this step.
    pub newly_ready: Vec<TaskId>,
    /// Tasks newly marked `failed` in this step, including the originating
    /// task and every dependent that failed with it.
    pub newly_failed: Vec<TaskId>,
    /// Terminal status of the owning expression, if this step finished it.
    pub expression_finished: Option<ExpressionStatus>,
}
