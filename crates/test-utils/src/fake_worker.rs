use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use calcdag::engine::{Dispatcher, ReportOutcome, TaskAssignment};
use calcdag::errors::Result;
use calcdag::exec::{LocalOrchestratorClient, OrchestratorClient, TaskReport, execute};

/// Synchronously lease, compute and report every ready task until the queue
/// is empty. Returns the number of tasks executed.
pub fn drive_to_completion(dispatcher: &Dispatcher) -> usize {
    let mut executed = 0;
    while let Some(task) = dispatcher.request_task() {
        let report = execute(&task);
        match report.outcome {
            Ok(value) => dispatcher.report_result(report.id, report.lease_token, value),
            Err(reason) => dispatcher.report_failure(report.id, report.lease_token, reason),
        };
        executed += 1;
    }
    executed
}

/// An in-process client that:
/// - records every task it handed out and every report it delivered
/// - silently loses the first `lose_reports` reports, like a worker that
///   crashed after fetching.
pub struct RecordingClient {
    inner: LocalOrchestratorClient,
    lose_reports: AtomicUsize,
    fetched: Arc<Mutex<Vec<TaskAssignment>>>,
    delivered: Arc<Mutex<Vec<(TaskReport, ReportOutcome)>>>,
}

impl RecordingClient {
    pub fn new(dispatcher: Arc<Dispatcher>, lose_reports: usize) -> Self {
        Self {
            inner: LocalOrchestratorClient::new(dispatcher),
            lose_reports: AtomicUsize::new(lose_reports),
            fetched: Arc::default(),
            delivered: Arc::default(),
        }
    }

    pub fn fetched(&self) -> Vec<TaskAssignment> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<(TaskReport, ReportOutcome)> {
        self.delivered.lock().unwrap().clone()
    }
}

impl OrchestratorClient for RecordingClient {
    fn fetch_task(&self) -> Pin<Box<dyn Future<Output = Result<Option<TaskAssignment>>> + Send + '_>> {
        Box::pin(async move {
            let task = self.inner.fetch_task().await?;
            if let Some(task) = &task {
                self.fetched.lock().unwrap().push(task.clone());
            }
            Ok(task)
        })
    }

    fn report(&self, report: TaskReport) -> Pin<Box<dyn Future<Output = Result<ReportOutcome>> + Send + '_>> {
        Box::pin(async move {
            let lost = self
                .lose_reports
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if lost {
                return Ok(ReportOutcome::Discarded);
            }

            let outcome = self.inner.report(report.clone()).await?;
            self.delivered.lock().unwrap().push((report, outcome));
            Ok(outcome)
        })
    }
}
