// src/exec/worker_loop.rs

//! Pool of polling workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::exec::backend::OrchestratorClient;
use crate::exec::compute::execute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Back-off after an empty queue or a transport error.
    pub poll_interval: Duration,
}

impl WorkerSettings {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval,
        }
    }
}

/// Spawn `computing_power` workers sharing `client`.
///
/// Each worker loops: fetch a task, sleep its `operation_time`, compute, and
/// report. All workers stop once `shutdown` flips to `true` or its sender is
/// dropped; a task in progress at that point is abandoned and will be
/// re-dispatched after its lease expires.
pub fn spawn_agent(
    client: Arc<dyn OrchestratorClient>,
    computing_power: usize,
    settings: WorkerSettings,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    info!(computing_power, poll_interval = ?settings.poll_interval, "starting workers");

    (0..computing_power)
        .map(|worker| {
            let client = Arc::clone(&client);
            let shutdown = shutdown.clone();
            tokio::spawn(run_worker(worker, client, settings, shutdown))
        })
        .collect()
}

async fn run_worker(
    worker: usize,
    client: Arc<dyn OrchestratorClient>,
    settings: WorkerSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker, "worker started");

    while !*shutdown.borrow() {
        let fetched = tokio::select! {
            fetched = client.fetch_task() => fetched,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        };

        let task = match fetched {
            Ok(Some(task)) => task,
            Ok(None) => {
                if sleep_or_shutdown(settings.poll_interval, &mut shutdown).await {
                    break;
                }
                continue;
            }
            Err(err) => {
                warn!(worker, error = %err, "failed to fetch task");
                if sleep_or_shutdown(settings.poll_interval, &mut shutdown).await {
                    break;
                }
                continue;
            }
        };

        debug!(worker, task = %task.id, op = %task.operation, "working on task");
        if sleep_or_shutdown(task.operation_time, &mut shutdown).await {
            break;
        }

        let report = execute(&task);
        if let Err(reason) = &report.outcome {
            debug!(worker, task = %task.id, %reason, "task failed");
        }

        match client.report(report).await {
            Ok(outcome) => debug!(worker, task = %task.id, ?outcome, "report delivered"),
            Err(err) => warn!(worker, task = %task.id, error = %err, "failed to deliver report"),
        }
    }

    debug!(worker, "worker stopped");
}

/// Sleep for `duration`. Returns `true` if shutdown was signalled first.
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = time::sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
