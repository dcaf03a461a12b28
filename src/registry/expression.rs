// src/registry/expression.rs

use std::fmt;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dag::{TaskFailure, TaskId};

/// Unique identifier of a submitted expression (UUID v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionId(pub String);

impl ExpressionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ExpressionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    /// Submitted; none of its tasks has been handed to a worker yet.
    Pending,
    /// At least one task has been leased.
    Processing,
    Done,
    Failed,
}

impl ExpressionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExpressionStatus::Done | ExpressionStatus::Failed)
    }
}

/// Registry record for one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    pub id: ExpressionId,
    pub status: ExpressionStatus,
    /// Valid only when `status == Done`.
    pub result: Option<f64>,
    /// Root cause when `status == Failed`.
    pub error: Option<TaskFailure>,
    /// `None` for a bare literal, which never needs a task.
    pub root_task_id: Option<TaskId>,
}

impl ExpressionNode {
    pub(crate) fn pending(id: ExpressionId, root_task_id: TaskId) -> Self {
        Self {
            id,
            status: ExpressionStatus::Pending,
            result: None,
            error: None,
            root_task_id: Some(root_task_id),
        }
    }

    pub(crate) fn resolved(id: ExpressionId, value: f64) -> Self {
        Self {
            id,
            status: ExpressionStatus::Done,
            result: Some(value),
            error: None,
            root_task_id: None,
        }
    }
}

/// Concurrent map of all expressions ever submitted.
///
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct ExpressionRegistry {
    expressions: DashMap<ExpressionId, ExpressionNode>,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: &ExpressionId) -> Option<ExpressionNode> {
        self.expressions.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every expression, in no particular order.
    pub fn list_all(&self) -> Vec<ExpressionNode> {
        self.expressions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub(crate) fn insert(&self, node: ExpressionNode) {
        debug!(expression = %node.id, status = ?node.status, "registering expression");
        self.expressions.insert(node.id.clone(), node);
    }

    pub(crate) fn mark_processing(&self, id: &ExpressionId) {
        if let Some(mut entry) = self.expressions.get_mut(id) {
            if entry.status == ExpressionStatus::Pending {
                entry.status = ExpressionStatus::Processing;
                debug!(expression = %id, "expression is processing");
            }
        }
    }

    pub(crate) fn complete(&self, id: &ExpressionId, value: f64) {
        match self.expressions.get_mut(id) {
            Some(mut entry) if !entry.status.is_terminal() => {
                entry.status = ExpressionStatus::Done;
                entry.result = Some(value);
                info!(expression = %id, result = value, "expression done");
            }
            Some(_) => warn!(expression = %id, "completion for terminated expression; ignoring"),
            None => warn!(expression = %id, "completion for unknown expression; ignoring"),
        }
    }

    pub(crate) fn fail(&self, id: &ExpressionId, reason: TaskFailure) {
        match self.expressions.get_mut(id) {
            Some(mut entry) if !entry.status.is_terminal() => {
                warn!(expression = %id, %reason, "expression failed");
                entry.status = ExpressionStatus::Failed;
                entry.error = Some(reason);
            }
            Some(_) => warn!(expression = %id, "failure for terminated expression; ignoring"),
            None => warn!(expression = %id, "failure for unknown expression; ignoring"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_snapshot() {
        let registry = ExpressionRegistry::new();
        let id = ExpressionId::new();
        registry.insert(ExpressionNode::pending(id.clone(), TaskId(7)));

        let node = registry.lookup(&id).unwrap();
        assert_eq!(node.status, ExpressionStatus::Pending);
        assert_eq!(node.root_task_id, Some(TaskId(7)));
        assert!(registry.lookup(&ExpressionId::new()).is_none());
    }

    #[test]
    fn terminal_status_is_final() {
        let registry = ExpressionRegistry::new();
        let id = ExpressionId::new();
        registry.insert(ExpressionNode::pending(id.clone(), TaskId(0)));

        registry.mark_processing(&id);
        assert_eq!(registry.lookup(&id).unwrap().status, ExpressionStatus::Processing);

        registry.complete(&id, 3.0);
        registry.fail(&id, TaskFailure::DivisionByZero);
        registry.mark_processing(&id);

        let node = registry.lookup(&id).unwrap();
        assert_eq!(node.status, ExpressionStatus::Done);
        assert_eq!(node.result, Some(3.0));
        assert_eq!(node.error, None);
    }

    #[test]
    fn list_all_contains_every_expression() {
        let registry = ExpressionRegistry::new();
        for value in [1.0, 2.0, 3.0] {
            registry.insert(ExpressionNode::resolved(ExpressionId::new(), value));
        }
        let mut results: Vec<f64> = registry
            .list_all()
            .into_iter()
            .filter_map(|n| n.result)
            .collect();
        results.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(results, vec![1.0, 2.0, 3.0]);
        assert_eq!(registry.len(), 3);
    }
}
