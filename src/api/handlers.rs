// src/api/handlers.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;

use super::error::ApiError;
use super::protocol::{
    CalculateRequest, CalculateResponse, ExpressionListResponse, ExpressionResponse,
    ReportRequest, ReportResponse, TaskResponse,
};
use crate::engine::Dispatcher;
use crate::exec::TaskReport;
use crate::registry::ExpressionId;

pub async fn calculate(
    State(dispatcher): State<Arc<Dispatcher>>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CalculateResponse>), ApiError> {
    let Json(request) = payload?;
    let id = dispatcher.submit(&request.expression)?;
    Ok((StatusCode::CREATED, Json(CalculateResponse { id })))
}

pub async fn list_expressions(State(dispatcher): State<Arc<Dispatcher>>) -> Json<ExpressionListResponse> {
    let expressions = dispatcher
        .list_expressions()
        .into_iter()
        .map(Into::into)
        .collect();
    Json(ExpressionListResponse { expressions })
}

pub async fn get_expression(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(id): Path<String>,
) -> Result<Json<ExpressionResponse>, ApiError> {
    let id = ExpressionId(id);
    let node = dispatcher
        .lookup(&id)
        .ok_or(ApiError::ExpressionNotFound(id))?;
    Ok(Json(ExpressionResponse {
        expression: node.into(),
    }))
}

pub async fn request_task(State(dispatcher): State<Arc<Dispatcher>>) -> Result<Json<TaskResponse>, ApiError> {
    let task = dispatcher.request_task().ok_or(ApiError::NoWorkAvailable)?;
    debug!(task = %task.id, "task handed out over http");
    Ok(Json(TaskResponse { task: task.into() }))
}

pub async fn submit_report(
    State(dispatcher): State<Arc<Dispatcher>>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(request) = payload?;
    let report = TaskReport::try_from(request).map_err(ApiError::InvalidRequest)?;

    let status = match report.outcome {
        Ok(value) => dispatcher.report_result(report.id, report.lease_token, value),
        Err(reason) => dispatcher.report_failure(report.id, report.lease_token, reason),
    };
    Ok(Json(ReportResponse { status }))
}
