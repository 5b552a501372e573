// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leadership moves between nodes

use crate::prelude::*;
use colony_core::Generator;

#[tokio::test]
async fn exclusive_assignment_follows_the_leader() {
    let cluster = Cluster::new(2, AssignmentMode::Exclusive);
    let executors = cluster.colony_with_executors(1).await;
    let executor = &executors[0].id;
    for _ in 0..2 {
        cluster.leader().submit_process(spec()).await.unwrap();
    }

    cluster
        .node(0)
        .assign(executor, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();

    cluster.membership.set_leader(Some("n2"));
    let stale = cluster
        .node(0)
        .assign(executor, COLONY, ResourceHints::default(), None)
        .await;
    match stale {
        Err(EngineError::NotLeader { leader }) => assert_eq!(leader.as_deref(), Some("n2")),
        other => panic!("expected NotLeader, got {:?}", other),
    }
    cluster
        .node(1)
        .assign(executor, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn no_leader_means_no_exclusive_assignment() {
    let cluster = Cluster::new(2, AssignmentMode::Exclusive);
    let executors = cluster.colony_with_executors(1).await;
    cluster.leader().submit_process(spec()).await.unwrap();
    cluster.membership.set_leader(None);

    for node in &cluster.nodes {
        let result = node
            .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
            .await;
        assert!(matches!(result, Err(EngineError::NotLeader { leader: None })));
    }
}

#[tokio::test]
async fn leader_poll_tracks_membership() {
    let cluster = Cluster::started(2, AssignmentMode::Exclusive, |config| {
        config.leader.poll_interval = Duration::from_millis(10);
    })
    .await;
    assert!(cluster.node(0).is_leader());
    assert!(!cluster.node(1).is_leader());

    cluster.membership.set_leader(Some("n2"));
    assert!(eventually(|| async { cluster.node(1).is_leader() }).await);
    assert!(eventually(|| async { !cluster.node(0).is_leader() }).await);

    let info = cluster.node(0).cluster_info().await.unwrap();
    assert_eq!(info.nodes.len(), 2);
    assert_eq!(info.leader.map(|n| n.name).as_deref(), Some("n2"));
    cluster.shutdown().await;
}

#[tokio::test]
async fn only_the_leader_fires_generators() {
    let cluster = Cluster::started(3, AssignmentMode::Distributed, |config| {
        config.leader.poll_interval = Duration::from_millis(10);
        config.generators.check_interval = Duration::from_millis(10);
    })
    .await;
    cluster.colony_with_executors(1).await;
    let generator = cluster
        .node(2)
        .add_generator(Generator::new(
            "",
            "pairs",
            WorkflowSpec::new(COLONY).with_spec(spec().with_node_name("job")),
            2,
            -1,
        ))
        .await
        .unwrap();
    for arg in ["a", "b", "c", "d", "e"] {
        cluster
            .node(1)
            .pack_generator(&generator.id, arg)
            .await
            .unwrap();
    }

    let graphs = || async {
        cluster
            .leader()
            .get_process_graphs(COLONY, None)
            .await
            .unwrap()
            .len()
    };
    assert!(eventually(|| async { graphs().await == 2 }).await);

    // Further ticks find only the odd argument left
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(graphs().await, 2);
    cluster.shutdown().await;
}
