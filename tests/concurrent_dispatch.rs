// tests/concurrent_dispatch.rs

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use calcdag::engine::{Dispatcher, ReportOutcome};
use calcdag::exec::execute;
use calcdag::registry::ExpressionStatus;
use calcdag_test_utils::{ConfigFileBuilder, init_tracing};

fn dispatcher() -> Arc<Dispatcher> {
    init_tracing();
    Arc::new(Dispatcher::new(
        ConfigFileBuilder::new()
            .with_lease_duration("60s")
            .with_operation_time("0ms")
            .dispatch_settings(),
    ))
}

#[test]
fn concurrent_requests_never_share_a_task() {
    let d = dispatcher();
    for i in 0..200 {
        d.submit(&format!("{i}+1")).unwrap();
    }

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let d = Arc::clone(&d);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut leased = Vec::new();
                while let Some(task) = d.request_task() {
                    leased.push(task.id);
                }
                leased
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for id in handle.join().unwrap() {
            total += 1;
            assert!(seen.insert(id), "task {id} was leased twice");
        }
    }
    assert_eq!(total, 200);
    assert_eq!(d.store().ready_count(), 0);
}

#[test]
fn concurrent_workers_resolve_shared_graphs() {
    let d = dispatcher();
    let ids: Vec<_> = (0..50)
        .map(|i| d.submit(&format!("(({i}+1)*(2+3)) - ((4*5)/(1+1))")).unwrap())
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let d = Arc::clone(&d);
            thread::spawn(move || {
                let mut idle_rounds = 0;
                while idle_rounds < 1000 {
                    match d.request_task() {
                        Some(task) => {
                            idle_rounds = 0;
                            let report = execute(&task);
                            let value = report.outcome.unwrap();
                            assert_eq!(
                                d.report_result(report.id, report.lease_token, value),
                                ReportOutcome::Accepted
                            );
                        }
                        None => {
                            idle_rounds += 1;
                            thread::yield_now();
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for (i, id) in ids.iter().enumerate() {
        let node = d.lookup(id).unwrap();
        assert_eq!(node.status, ExpressionStatus::Done);
        assert_eq!(node.result, Some((i as f64 + 1.0) * 5.0 - 10.0));
    }
    assert_eq!(d.store().task_count(), 0);
}
