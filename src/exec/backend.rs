// src/exec/backend.rs

//! Pluggable transport between a worker and the orchestrator.
//!
//! Workers talk to an [`OrchestratorClient`] instead of a concrete transport:
//!
//! - [`HttpOrchestratorClient`] is used by `calcdag agent` and speaks the
//!   JSON API over `reqwest`.
//! - [`LocalOrchestratorClient`] calls a [`Dispatcher`] in the same process;
//!   `calcdag serve --local-workers N` and tests use it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::{Client, StatusCode};

use crate::api::protocol::{ReportRequest, ReportResponse, TASK_PATH, TaskResponse};
use crate::engine::{Dispatcher, ReportOutcome, TaskAssignment};
use crate::errors::{CalcdagError, Result};
use crate::exec::compute::TaskReport;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Trait abstracting how a worker fetches work and returns results.
pub trait OrchestratorClient: Send + Sync {
    /// Lease the next task, or `Ok(None)` when nothing is ready.
    fn fetch_task(&self) -> BoxFuture<'_, Option<TaskAssignment>>;

    /// Deliver a worker's report for a previously fetched task.
    fn report(&self, report: TaskReport) -> BoxFuture<'_, ReportOutcome>;
}

/// In-process client backed by a shared [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct LocalOrchestratorClient {
    dispatcher: Arc<Dispatcher>,
}

impl LocalOrchestratorClient {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl OrchestratorClient for LocalOrchestratorClient {
    fn fetch_task(&self) -> BoxFuture<'_, Option<TaskAssignment>> {
        Box::pin(async move { Ok(self.dispatcher.request_task()) })
    }

    fn report(&self, report: TaskReport) -> BoxFuture<'_, ReportOutcome> {
        Box::pin(async move {
            let outcome = match report.outcome {
                Ok(value) => self
                    .dispatcher
                    .report_result(report.id, report.lease_token, value),
                Err(reason) => self
                    .dispatcher
                    .report_failure(report.id, report.lease_token, reason),
            };
            Ok(outcome)
        })
    }
}

/// Client for a remote orchestrator's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpOrchestratorClient {
    client: Client,
    base_url: String,
}

impl HttpOrchestratorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn task_url(&self) -> String {
        format!("{}{}", self.base_url, TASK_PATH)
    }
}

impl OrchestratorClient for HttpOrchestratorClient {
    fn fetch_task(&self) -> BoxFuture<'_, Option<TaskAssignment>> {
        Box::pin(async move {
            let response = self.client.get(self.task_url()).send().await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.json::<TaskResponse>().await?;
                    Ok(Some(body.task.into()))
                }
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(CalcdagError::Other(anyhow::anyhow!(
                    "orchestrator answered {status} to task request"
                ))),
            }
        })
    }

    fn report(&self, report: TaskReport) -> BoxFuture<'_, ReportOutcome> {
        Box::pin(async move {
            let body = ReportRequest::from(report);
            let response = self
                .client
                .post(self.task_url())
                .json(&body)
                .send()
                .await?
                .error_for_status()?;

            let ack = response.json::<ReportResponse>().await?;
            Ok(ack.status)
        })
    }
}
