use std::sync::Arc;
use std::time::{Duration, Instant};

use calcdag::compiler::compile;
use calcdag::dag::{Operand, TaskGraphStore, TaskId, TaskState};
use calcdag::exec::evaluate;
use calcdag::registry::ExpressionRegistry;
use proptest::prelude::*;

use crate::compiler::{expected, expr_tree};

const LEASE: Duration = Duration::from_secs(60);

fn store() -> TaskGraphStore {
    TaskGraphStore::new(Arc::new(ExpressionRegistry::new()))
}

proptest! {
    #[test]
    fn completion_readies_exactly_the_resolved_dependents(expr in expr_tree()) {
        let store = store();
        let id = store.register_expression(&compile(&expr.render()).unwrap());

        while let Some(task) = store.next_ready_task() {
            let token = store.lease_task(task.id, LEASE).unwrap();
            let (a, b) = task.resolved_operands().unwrap();
            let value = evaluate(task.operation, a, b).unwrap();

            let before = store.tasks_of(&id);
            let resolved_after = |node_id: TaskId| {
                before.iter().find(|n| n.id == node_id).is_some_and(|n| {
                    [n.left, n.right].iter().all(|operand| match operand {
                        Operand::Literal(_) => true,
                        Operand::TaskRef(upstream) => *upstream == task.id,
                    })
                })
            };

            let step = store.complete_task(task.id, token, value).unwrap();

            for dependent in &task.dependents {
                if resolved_after(*dependent) {
                    prop_assert!(
                        step.newly_ready.contains(dependent) || step.newly_failed.contains(dependent),
                        "dependent {} should have been resolved", dependent
                    );
                } else if let Some(node) = store.task(*dependent) {
                    prop_assert_eq!(node.state, TaskState::Blocked);
                }
            }
            for ready in &step.newly_ready {
                prop_assert!(resolved_after(*ready), "task {} became ready too early", ready);
            }
        }

        let node = store.registry().lookup(&id).unwrap();
        prop_assert_eq!((node.status, node.result, node.error), expected(expr.eval()));
    }

    #[test]
    fn abandoned_leases_are_retried_and_late_reports_rejected(
        expr in expr_tree(),
        abandon in proptest::collection::vec(any::<bool>(), 0..32),
    ) {
        let store = store();
        let id = store.register_expression(&compile(&expr.render()).unwrap());
        let mut abandon = abandon.into_iter();
        let mut late = Vec::new();

        loop {
            let Some(task) = store.next_ready_task() else {
                let far_future = Instant::now() + Duration::from_secs(3600);
                if store.reclaim_expired_leases(far_future).is_empty() {
                    break;
                }
                continue;
            };

            let token = store.lease_task(task.id, LEASE).unwrap();
            let (a, b) = task.resolved_operands().unwrap();
            let value = evaluate(task.operation, a, b).unwrap();

            if abandon.next().unwrap_or(false) {
                late.push((task.id, token, value));
                continue;
            }
            store.complete_task(task.id, token, value).unwrap();
        }

        for (task, token, value) in late {
            prop_assert!(store.complete_task(task, token, value).is_err());
        }
        prop_assert_eq!(store.task_count(), 0);

        let node = store.registry().lookup(&id).unwrap();
        prop_assert_eq!((node.status, node.result, node.error), expected(expr.eval()));
    }
}
