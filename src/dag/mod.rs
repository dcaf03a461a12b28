// src/dag/mod.rs

//! Task graph store.
//!
//! - [`task_info`] defines task nodes, operands, states and lease tokens.
//! - [`state_manager`] propagates results and failures between tasks.
//! - [`step`] defines the result type of a single store mutation.
//! - [`store`] holds every in-flight task behind one lock and exposes the
//!   atomic operations used by the dispatcher.

pub mod state_manager;
pub mod step;
pub mod store;
pub mod task_info;

use thiserror::Error;

pub use step::ResolutionStep;
pub use store::TaskGraphStore;
pub use task_info::{LeaseToken, Operand, TaskFailure, TaskId, TaskNode, TaskState};

/// Precondition failures of store operations.
///
/// None of these is fatal: the dispatcher either retries (`TaskNotReady`
/// while racing another worker) or discards the report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("task {task} is not ready (state: {state})")]
    TaskNotReady { task: TaskId, state: &'static str },

    #[error("stale or unknown lease token for task {0}")]
    StaleLeaseToken(TaskId),
}
