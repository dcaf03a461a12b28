// src/exec/mod.rs

//! Worker side of calcdag.
//!
//! - [`compute`] performs the arithmetic of one task.
//! - [`backend`] provides the `OrchestratorClient` transport trait with an
//!   HTTP implementation and an in-process one.
//! - [`worker_loop`] runs `computing_power` polling workers against a client.

pub mod backend;
pub mod compute;
pub mod worker_loop;

pub use backend::{HttpOrchestratorClient, LocalOrchestratorClient, OrchestratorClient};
pub use compute::{TaskReport, evaluate, execute};
pub use worker_loop::{WorkerSettings, spawn_agent};
