// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflows whose members run on different nodes

use crate::prelude::*;
use serde_json::json;

/// extract -> {left, right} -> join
fn diamond() -> WorkflowSpec {
    WorkflowSpec::new(COLONY)
        .with_spec(spec().with_node_name("extract"))
        .with_spec(spec().with_node_name("left").with_dependencies(vec!["extract"]))
        .with_spec(spec().with_node_name("right").with_dependencies(vec!["extract"]))
        .with_spec(
            spec()
                .with_node_name("join")
                .with_dependencies(vec!["left", "right"]),
        )
}

async fn take(cluster: &Cluster, node: usize, executor: &Executor) -> Process {
    cluster
        .node(node)
        .assign(&executor.id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap()
}

async fn by_name(cluster: &Cluster, ids: &[colony_core::ProcessId], name: &str) -> Process {
    for id in ids {
        let process = cluster.leader().get_process(id).await.unwrap();
        if process.spec.node_name == name {
            return process;
        }
    }
    panic!("no member named {}", name);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn diamond_completes_across_nodes() {
    let cluster = Cluster::new(2, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(2).await;
    let graph = cluster.node(1).submit_workflow(diamond()).await.unwrap();

    let extract = take(&cluster, 0, &executors[0]).await;
    assert_eq!(extract.spec.node_name, "extract");
    cluster
        .node(0)
        .close_successful(&extract.id, &executors[0].id, vec![json!({"rows": 3})])
        .await
        .unwrap();

    let first = take(&cluster, 0, &executors[0]).await;
    let second = take(&cluster, 1, &executors[1]).await;
    assert_ne!(first.id, second.id);
    assert_eq!(first.input, vec![json!({"rows": 3})]);

    // Close both branches at once on different nodes
    let (a, b) = tokio::join!(
        cluster.node(0).close_successful(
            &first.id,
            &executors[0].id,
            vec![json!(first.spec.node_name.clone())],
        ),
        cluster.node(1).close_successful(
            &second.id,
            &executors[1].id,
            vec![json!(second.spec.node_name.clone())],
        ),
    );
    a.unwrap();
    b.unwrap();

    // A release lost to the race is repaired by the next sweep
    cluster.node(1).sweep_timeouts().await.unwrap();

    let join = by_name(&cluster, &graph.process_ids, "join").await;
    assert!(join.is_assignable());
    assert_eq!(join.input, vec![json!("left"), json!("right")]);

    let join = take(&cluster, 1, &executors[1]).await;
    cluster
        .node(1)
        .close_successful(&join.id, &executors[1].id, vec![])
        .await
        .unwrap();

    let done = cluster.node(0).get_process_graph(&graph.id).await.unwrap();
    assert_eq!(done.state, ProcessState::Success);
}

#[tokio::test]
async fn failed_member_fails_the_graph_everywhere() {
    let cluster = Cluster::new(2, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(1).await;
    let graph = cluster.node(0).submit_workflow(diamond()).await.unwrap();

    let extract = take(&cluster, 1, &executors[0]).await;
    cluster
        .node(1)
        .close_failed(&extract.id, &executors[0].id, vec!["bad input".to_string()])
        .await
        .unwrap();

    for node in &cluster.nodes {
        let seen = node.get_process_graph(&graph.id).await.unwrap();
        assert_eq!(seen.state, ProcessState::Failed);
    }
    for name in ["left", "right", "join"] {
        let member = by_name(&cluster, &graph.process_ids, name).await;
        assert_eq!(member.state, ProcessState::Failed);
    }
}

#[tokio::test]
async fn waiter_on_another_node_sees_graph_finish() {
    let cluster = Cluster::new(2, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(1).await;
    let graph = cluster
        .node(0)
        .submit_workflow(WorkflowSpec::new(COLONY).with_spec(spec().with_node_name("solo")))
        .await
        .unwrap();
    let solo = graph.process_ids[0].clone();

    let (waited, closed) = tokio::join!(
        cluster
            .node(1)
            .wait_for_process(&solo, ProcessState::Success, Duration::from_secs(5)),
        async {
            let process = take(&cluster, 0, &executors[0]).await;
            cluster
                .node(0)
                .close_successful(&process.id, &executors[0].id, vec![])
                .await
        }
    );

    closed.unwrap();
    assert_eq!(waited.unwrap().unwrap().state, ProcessState::Success);
}
