// src/api/protocol.rs

//! JSON bodies exchanged over HTTP, shared by the server handlers and the
//! HTTP worker client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compiler::Operator;
use crate::dag::{LeaseToken, TaskFailure, TaskId};
use crate::engine::{ReportOutcome, TaskAssignment};
use crate::exec::TaskReport;
use crate::registry::{ExpressionId, ExpressionNode, ExpressionStatus};

pub const CALCULATE_PATH: &str = "/api/v1/calculate";
pub const EXPRESSIONS_PATH: &str = "/api/v1/expressions";
pub const EXPRESSION_PATH: &str = "/api/v1/expressions/{id}";
pub const TASK_PATH: &str = "/internal/task";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub id: ExpressionId,
}

/// Public view of one expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionView {
    pub id: ExpressionId,
    pub status: ExpressionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
}

impl From<ExpressionNode> for ExpressionView {
    fn from(node: ExpressionNode) -> Self {
        Self {
            id: node.id,
            status: node.status,
            result: node.result,
            error: node.error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionListResponse {
    pub expressions: Vec<ExpressionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionResponse {
    pub expression: ExpressionView,
}

/// A leased task as sent to a worker. `operation_time` is in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: TaskId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operator,
    pub operation_time: u64,
    pub lease_token: LeaseToken,
}

impl From<TaskAssignment> for TaskPayload {
    fn from(task: TaskAssignment) -> Self {
        Self {
            id: task.id,
            arg1: task.arg1,
            arg2: task.arg2,
            operation: task.operation,
            operation_time: u64::try_from(task.operation_time.as_millis()).unwrap_or(u64::MAX),
            lease_token: task.lease_token,
        }
    }
}

impl From<TaskPayload> for TaskAssignment {
    fn from(payload: TaskPayload) -> Self {
        Self {
            id: payload.id,
            arg1: payload.arg1,
            arg2: payload.arg2,
            operation: payload.operation,
            operation_time: Duration::from_millis(payload.operation_time),
            lease_token: payload.lease_token,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task: TaskPayload,
}

/// A worker's report. Exactly one of `result` and `error` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub id: TaskId,
    pub lease_token: LeaseToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
}

impl From<TaskReport> for ReportRequest {
    fn from(report: TaskReport) -> Self {
        let (result, error) = match report.outcome {
            Ok(value) => (Some(value), None),
            Err(reason) => (None, Some(reason)),
        };
        Self {
            id: report.id,
            lease_token: report.lease_token,
            result,
            error,
        }
    }
}

impl TryFrom<ReportRequest> for TaskReport {
    type Error = String;

    fn try_from(req: ReportRequest) -> Result<Self, Self::Error> {
        let outcome = match (req.result, req.error) {
            (Some(value), None) => Ok(value),
            (None, Some(reason)) => Err(reason),
            (Some(_), Some(_)) => return Err("report must not carry both `result` and `error`".to_string()),
            (None, None) => return Err("report must carry either `result` or `error`".to_string()),
        };
        Ok(TaskReport {
            id: req.id,
            lease_token: req.lease_token,
            outcome,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: ReportOutcome,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn failure_report_uses_tagged_error() {
        let token = LeaseToken::new();
        let req = ReportRequest::from(TaskReport {
            id: TaskId(3),
            lease_token: token,
            outcome: Err(TaskFailure::DivisionByZero),
        });
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "lease_token": token.to_string(),
                "error": { "kind": "division_by_zero" }
            })
        );
    }

    #[test]
    fn report_needs_exactly_one_outcome() {
        let token = LeaseToken::new();
        let both = ReportRequest {
            id: TaskId(1),
            lease_token: token,
            result: Some(1.0),
            error: Some(TaskFailure::DivisionByZero),
        };
        assert!(TaskReport::try_from(both).is_err());

        let neither = ReportRequest {
            id: TaskId(1),
            lease_token: token,
            result: None,
            error: None,
        };
        assert!(TaskReport::try_from(neither).is_err());
    }

    #[test]
    fn task_payload_carries_millis_and_symbol() {
        let payload = TaskPayload::from(TaskAssignment {
            id: TaskId(9),
            arg1: 1.5,
            arg2: 2.0,
            operation: Operator::Multiply,
            operation_time: Duration::from_millis(250),
            lease_token: LeaseToken::new(),
        });
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["operation"], "*");
        assert_eq!(value["operation_time"], 250);
        assert_eq!(value["id"], 9);
    }
}
