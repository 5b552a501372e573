// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::{node, spec, TestNode, COLONY};
use crate::{EngineError, ResourceHints};
use colony_core::{Executor, Process, ProcessGraph, ProcessState, WorkflowSpec};
use serde_json::json;

/// a -> {b, c} -> d
fn diamond() -> WorkflowSpec {
    WorkflowSpec::new(COLONY)
        .with_spec(spec().with_node_name("a"))
        .with_spec(spec().with_node_name("b").with_dependencies(vec!["a"]))
        .with_spec(spec().with_node_name("c").with_dependencies(vec!["a"]))
        .with_spec(spec().with_node_name("d").with_dependencies(vec!["b", "c"]))
}

async fn member(node: &TestNode, graph: &ProcessGraph, name: &str) -> Process {
    for id in &graph.process_ids {
        let process = node.controller.get_process(id).await.unwrap();
        if process.spec.node_name == name {
            return process;
        }
    }
    panic!("no member named {}", name);
}

async fn graph_state(node: &TestNode, graph: &ProcessGraph) -> ProcessState {
    node.controller
        .get_process_graph(&graph.id)
        .await
        .unwrap()
        .state
}

/// Assign one process and close it successfully with its own name as output
async fn run_one(node: &TestNode, executor: &Executor) -> Process {
    let process = node
        .controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
    let output = vec![json!(process.spec.node_name.clone())];
    node.controller
        .close_successful(&process.id, &executor.id, output)
        .await
        .unwrap()
}

#[tokio::test]
async fn only_roots_start_assignable() {
    let node = node();
    node.with_executor().await;
    let graph = node.controller.submit_workflow(diamond()).await.unwrap();

    assert_eq!(graph.process_ids.len(), 4);
    assert_eq!(graph.state, ProcessState::Waiting);
    let a = member(&node, &graph, "a").await;
    assert_eq!(graph.root_process_ids, vec![a.id.clone()]);
    assert!(a.is_assignable());
    for name in ["b", "c", "d"] {
        let blocked = member(&node, &graph, name).await;
        assert!(blocked.wait_for_parents, "{} should be blocked", name);
        assert!(!blocked.is_assignable());
    }
}

#[tokio::test]
async fn diamond_runs_in_dependency_order() {
    let node = node();
    let executor = node.with_executor().await;
    let graph = node.controller.submit_workflow(diamond()).await.unwrap();

    let first = run_one(&node, &executor).await;
    assert_eq!(first.spec.node_name, "a");
    assert_eq!(graph_state(&node, &graph).await, ProcessState::Running);

    let d = member(&node, &graph, "d").await;
    assert!(d.wait_for_parents);

    let mut middle: Vec<String> = Vec::new();
    for _ in 0..2 {
        middle.push(run_one(&node, &executor).await.spec.node_name);
    }
    middle.sort();
    assert_eq!(middle, vec!["b".to_string(), "c".to_string()]);

    let d = member(&node, &graph, "d").await;
    assert!(d.is_assignable());
    assert_eq!(d.input, vec![json!("b"), json!("c")]);

    let last = run_one(&node, &executor).await;
    assert_eq!(last.spec.node_name, "d");
    let finished = node.controller.get_process_graph(&graph.id).await.unwrap();
    assert_eq!(finished.state, ProcessState::Success);
    assert!(finished.end_time.is_some());
}

#[tokio::test]
async fn children_receive_parent_output() {
    let node = node();
    let executor = node.with_executor().await;
    let graph = node.controller.submit_workflow(diamond()).await.unwrap();

    run_one(&node, &executor).await;

    let b = member(&node, &graph, "b").await;
    let c = member(&node, &graph, "c").await;
    assert_eq!(b.input, vec![json!("a")]);
    assert_eq!(c.input, vec![json!("a")]);
}

#[tokio::test]
async fn root_failure_fails_every_descendant() {
    let node = node();
    let executor = node.with_executor().await;
    let graph = node.controller.submit_workflow(diamond()).await.unwrap();

    let a = node
        .controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
    node.controller
        .close_failed(&a.id, &executor.id, vec!["crashed".to_string()])
        .await
        .unwrap();

    for name in ["b", "c", "d"] {
        let doomed = member(&node, &graph, name).await;
        assert_eq!(doomed.state, ProcessState::Failed, "{} should fail", name);
        assert!(doomed.errors.iter().any(|e| e.contains("failed")));
    }
    assert_eq!(graph_state(&node, &graph).await, ProcessState::Failed);

    let nothing = node
        .controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await;
    assert!(matches!(nothing, Err(EngineError::NoWorkAvailable)));
}

#[tokio::test]
async fn branch_failure_spares_the_sibling_branch() {
    let node = node();
    let executor = node.with_executor().await;
    let graph = node.controller.submit_workflow(diamond()).await.unwrap();
    run_one(&node, &executor).await;

    let first = node
        .controller
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
    node.controller
        .close_failed(&first.id, &executor.id, vec!["bad".to_string()])
        .await
        .unwrap();

    assert_eq!(graph_state(&node, &graph).await, ProcessState::Failed);
    assert_eq!(member(&node, &graph, "d").await.state, ProcessState::Failed);

    let sibling = if first.spec.node_name == "b" { "c" } else { "b" };
    let sibling = member(&node, &graph, sibling).await;
    assert_eq!(sibling.state, ProcessState::Waiting);
}

#[tokio::test]
async fn cyclic_workflow_is_rejected() {
    let node = node();
    node.with_executor().await;
    let cyclic = WorkflowSpec::new(COLONY)
        .with_spec(spec().with_node_name("a").with_dependencies(vec!["b"]))
        .with_spec(spec().with_node_name("b").with_dependencies(vec!["a"]));

    let result = node.controller.submit_workflow(cyclic).await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(node
        .controller
        .get_process_graphs(COLONY, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn graphs_are_listed_by_state() {
    let node = node();
    let executor = node.with_executor().await;
    let first = node
        .controller
        .submit_workflow(WorkflowSpec::new(COLONY).with_spec(spec().with_node_name("x")))
        .await
        .unwrap();
    node.controller
        .submit_workflow(WorkflowSpec::new(COLONY).with_spec(spec().with_node_name("y")))
        .await
        .unwrap();
    run_one(&node, &executor).await;

    let done = node
        .controller
        .get_process_graphs(COLONY, Some(ProcessState::Success))
        .await
        .unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, first.id);
    let all = node.controller.get_process_graphs(COLONY, None).await.unwrap();
    assert_eq!(all.len(), 2);
}
