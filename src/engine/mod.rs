// src/engine/mod.rs

//! Scheduling front of calcdag.
//!
//! - [`dispatcher`] leases ready tasks to workers and routes their reports
//!   into the task graph store.
//! - [`sweeper`] periodically re-queues leases whose deadline has passed, so
//!   a crashed worker's task becomes available again without new traffic.

pub mod dispatcher;
pub mod sweeper;

pub use dispatcher::{DispatchSettings, Dispatcher, ReportOutcome, TaskAssignment};
pub use sweeper::spawn_lease_sweeper;
