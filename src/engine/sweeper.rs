// src/engine/sweeper.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Dispatcher;

/// Spawn the background loop that re-queues expired leases every `interval`.
///
/// Runs independently of request traffic until `shutdown` flips to `true` (or
/// its sender is dropped).
pub fn spawn_lease_sweeper(
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?interval, "lease sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reclaimed = dispatcher.reclaim_expired();
                    if !reclaimed.is_empty() {
                        warn!(count = reclaimed.len(), tasks = ?reclaimed, "re-queued expired leases");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("lease sweeper stopped");
    })
}
