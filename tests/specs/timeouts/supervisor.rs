// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout sweeps running on every node

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sweeps_retry_once() {
    let cluster = Cluster::new(3, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(1).await;
    cluster
        .leader()
        .submit_process(spec().with_max_exec_time(1).with_max_retries(5))
        .await
        .unwrap();
    let process = cluster
        .node(2)
        .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();

    cluster.clock.advance(Duration::from_secs(2));
    let (a, b, c) = tokio::join!(
        cluster.node(0).sweep_timeouts(),
        cluster.node(1).sweep_timeouts(),
        cluster.node(2).sweep_timeouts(),
    );
    let retried = a.unwrap().retried + b.unwrap().retried + c.unwrap().retried;
    assert_eq!(retried, 1);

    let returned = cluster.leader().get_process(&process.id).await.unwrap();
    assert_eq!(returned.state, ProcessState::Waiting);
    assert_eq!(returned.retries, 1);
}

#[tokio::test]
async fn background_sweep_fails_overdue_work() {
    let cluster = Cluster::started(2, AssignmentMode::Exclusive, |config| {
        config.timeouts.sweep_interval = Duration::from_millis(10);
    })
    .await;
    let executors = cluster.colony_with_executors(1).await;
    cluster
        .node(1)
        .submit_process(spec().with_max_exec_time(1))
        .await
        .unwrap();
    let process = cluster
        .leader()
        .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();

    cluster.clock.advance(Duration::from_secs(2));
    let failed = cluster
        .node(1)
        .wait_for_process(&process.id, ProcessState::Failed, Duration::from_secs(2))
        .await
        .unwrap()
        .unwrap();
    assert!(failed.errors.iter().any(|e| e.contains("execution time")));

    // Closing after the deadline is refused
    let late = cluster
        .leader()
        .close_successful(&process.id, &executors[0].id, vec![])
        .await;
    assert!(matches!(late, Err(EngineError::InvalidState(_))));
    cluster.shutdown().await;
}

#[tokio::test]
async fn background_sweep_returns_work_for_retry() {
    let cluster = Cluster::started(1, AssignmentMode::Exclusive, |config| {
        config.timeouts.sweep_interval = Duration::from_millis(10);
    })
    .await;
    let executors = cluster.colony_with_executors(2).await;
    let node = cluster.leader();
    node.submit_process(spec().with_max_exec_time(1).with_max_retries(-1))
        .await
        .unwrap();
    let lost = node
        .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();

    cluster.clock.advance(Duration::from_secs(2));
    let retried = node
        .assign(
            &executors[1].id,
            COLONY,
            ResourceHints::default(),
            Some(Duration::from_secs(2)),
        )
        .await
        .unwrap();
    assert_eq!(retried.id, lost.id);
    assert_eq!(retried.retries, 1);
    assert!(retried.is_assigned_to(&executors[1].id));
    cluster.shutdown().await;
}
