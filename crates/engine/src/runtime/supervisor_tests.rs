// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::SweepReport;
use crate::test_helpers::{node, spec, TestNode, COLONY};
use crate::ResourceHints;
use colony_core::{Executor, FunctionSpec, Process, ProcessState, WorkflowSpec};
use colony_storage::Store;
use serde_json::json;
use std::time::Duration;

async fn submit_and_assign(node: &TestNode, executor: &Executor, spec: FunctionSpec) -> Process {
    node.controller.submit_process(spec).await.unwrap();
    node.controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap()
}

#[tokio::test]
async fn expired_process_with_retries_returns_to_pool() {
    let node = node();
    let executor = node.with_executor().await;
    let process = submit_and_assign(
        &node,
        &executor,
        spec().with_max_exec_time(1).with_max_retries(1),
    )
    .await;
    assert!(process.exec_deadline.is_some());

    node.clock.advance(Duration::from_secs(2));
    let report = node.controller.sweep_timeouts().await.unwrap();
    assert_eq!(report.retried, 1);

    let returned = node.controller.get_process(&process.id).await.unwrap();
    assert_eq!(returned.state, ProcessState::Waiting);
    assert_eq!(returned.retries, 1);
    assert!(returned.assigned_executor_id.is_none());

    node.controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
    node.clock.advance(Duration::from_secs(2));
    let report = node.controller.sweep_timeouts().await.unwrap();
    assert_eq!(report.failed, 1);
    let failed = node.controller.get_process(&process.id).await.unwrap();
    assert_eq!(failed.state, ProcessState::Failed);
}

#[tokio::test]
async fn expired_process_without_retries_fails() {
    let node = node();
    let executor = node.with_executor().await;
    let process = submit_and_assign(&node, &executor, spec().with_max_exec_time(1)).await;

    node.clock.advance(Duration::from_secs(2));
    let report = node.controller.sweep_timeouts().await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            failed: 1,
            ..SweepReport::default()
        }
    );

    let failed = node.controller.get_process(&process.id).await.unwrap();
    assert_eq!(failed.state, ProcessState::Failed);
    assert!(failed.errors.iter().any(|e| e.contains("execution time")));
}

#[tokio::test]
async fn unlimited_retries_never_fail() {
    let node = node();
    let executor = node.with_executor().await;
    let process = submit_and_assign(
        &node,
        &executor,
        spec().with_max_exec_time(1).with_max_retries(-1),
    )
    .await;

    for round in 1..=6u32 {
        node.clock.advance(Duration::from_secs(2));
        node.controller.sweep_timeouts().await.unwrap();
        let returned = node.controller.get_process(&process.id).await.unwrap();
        assert_eq!(returned.state, ProcessState::Waiting);
        assert_eq!(returned.retries, round);
        node.controller
            .assign(&executor.id, COLONY, ResourceHints::default(), None)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn deadline_is_exclusive() {
    let node = node();
    let executor = node.with_executor().await;
    submit_and_assign(&node, &executor, spec().with_max_exec_time(1)).await;

    node.clock.advance(Duration::from_secs(1));
    assert!(node.controller.sweep_timeouts().await.unwrap().is_empty());
}

#[tokio::test]
async fn unassigned_process_fails_at_wait_deadline() {
    let node = node();
    node.with_executor().await;
    let process = node
        .controller
        .submit_process(spec().with_max_wait_time(1))
        .await
        .unwrap();

    node.clock.advance(Duration::from_secs(2));
    let report = node.controller.sweep_timeouts().await.unwrap();
    assert_eq!(report.failed, 1);

    let failed = node.controller.get_process(&process.id).await.unwrap();
    assert_eq!(failed.state, ProcessState::Failed);
    assert!(failed.errors.iter().any(|e| e.contains("wait time")));
}

#[tokio::test]
async fn second_sweep_changes_nothing() {
    let node = node();
    let executor = node.with_executor().await;
    submit_and_assign(&node, &executor, spec().with_max_exec_time(1).with_max_retries(3)).await;
    node.controller
        .submit_process(spec().with_max_wait_time(1))
        .await
        .unwrap();

    node.clock.advance(Duration::from_secs(2));
    let first = node.controller.sweep_timeouts().await.unwrap();
    assert_eq!(first.retried, 1);
    assert_eq!(first.failed, 1);

    let second = node.controller.sweep_timeouts().await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn stranded_child_is_released() {
    let node = node();
    let executor = node.with_executor().await;
    let graph = node
        .controller
        .submit_workflow(
            WorkflowSpec::new(COLONY)
                .with_spec(spec().with_node_name("parent"))
                .with_spec(spec().with_node_name("child").with_dependencies(vec!["parent"])),
        )
        .await
        .unwrap();
    let parent = node
        .controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();

    // Close the parent behind the engine's back so no release happens
    let closed = Process {
        state: ProcessState::Success,
        assigned_executor_id: None,
        output: vec![json!(7)],
        ..parent
    };
    node.store.update_process(&closed).await.unwrap();

    let child_id = graph
        .process_ids
        .iter()
        .find(|id| **id != closed.id)
        .cloned()
        .unwrap();
    let child = node.controller.get_process(&child_id).await.unwrap();
    assert!(child.wait_for_parents);

    let report = node.controller.sweep_timeouts().await.unwrap();
    assert_eq!(report.released, 1);

    let child = node.controller.get_process(&child_id).await.unwrap();
    assert!(child.is_assignable());
    assert_eq!(child.input, vec![json!(7)]);
}
