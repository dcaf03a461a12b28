// src/api/mod.rs

//! HTTP transport for the dispatcher, built on `axum`.
//!
//! Public routes live under `/api/v1`; workers talk to `/internal/task`.

pub mod error;
pub mod handlers;
pub mod protocol;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use crate::engine::Dispatcher;
use crate::errors::Result;

pub use error::ApiError;

/// Build the router with all routes bound to `dispatcher`.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route(protocol::CALCULATE_PATH, post(handlers::calculate))
        .route(protocol::EXPRESSIONS_PATH, get(handlers::list_expressions))
        .route(protocol::EXPRESSION_PATH, get(handlers::get_expression))
        .route(
            protocol::TASK_PATH,
            get(handlers::request_task).post(handlers::submit_report),
        )
        .with_state(dispatcher)
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, dispatcher: Arc<Dispatcher>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "http api listening");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("http api stopped");
    Ok(())
}
