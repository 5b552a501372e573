// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! At-most-once assignment across nodes
//!
//! Many executors pull from the same colony through different nodes at the
//! same time. Every process must be handed out exactly once.

use crate::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;

/// Executors pull concurrently until the pool looks empty, then one
/// executor drains whatever lost races left behind
async fn pull_everything(
    cluster: Arc<Cluster>,
    executors: Vec<Executor>,
    route: fn(usize, usize) -> usize,
) -> Vec<Process> {
    let mut tasks = Vec::new();
    for (i, executor) in executors.iter().cloned().enumerate() {
        let cluster = cluster.clone();
        let node = route(i, cluster.nodes.len());
        tasks.push(tokio::spawn(async move {
            let mut taken = Vec::new();
            loop {
                match cluster
                    .node(node)
                    .assign(&executor.id, COLONY, ResourceHints::default(), None)
                    .await
                {
                    Ok(process) => taken.push(process),
                    Err(EngineError::NoWorkAvailable) => break,
                    Err(e) => panic!("unexpected assign error: {}", e),
                }
            }
            taken
        }));
    }

    let mut taken = Vec::new();
    for task in tasks {
        taken.extend(task.await.unwrap());
    }
    let drain = &executors[0];
    while let Ok(process) = cluster
        .leader()
        .assign(&drain.id, COLONY, ResourceHints::default(), None)
        .await
    {
        taken.push(process);
    }
    taken
}

fn assert_each_once(taken: &[Process], submitted: &[Process]) {
    let ids: HashSet<_> = taken.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids.len(), taken.len(), "a process was assigned twice");
    let expected: HashSet<_> = submitted.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, expected);
    assert!(taken.iter().all(|p| p.state == ProcessState::Running));
}

async fn run_case(mode: AssignmentMode, nodes: usize, executors: usize, processes: usize) {
    let cluster = Arc::new(Cluster::new(nodes, mode));
    let workers = cluster.colony_with_executors(executors).await;
    let mut submitted = Vec::new();
    for i in 0..processes {
        let node = cluster.node(i % nodes);
        submitted.push(node.submit_process(spec()).await.unwrap());
    }

    let route: fn(usize, usize) -> usize = match mode {
        AssignmentMode::Exclusive => |_, _| 0,
        AssignmentMode::Distributed => |i, n| i % n,
    };
    let taken = pull_everything(cluster.clone(), workers, route).await;
    assert_each_once(&taken, &submitted);

    for process in &taken {
        let stored = cluster.leader().get_process(&process.id).await.unwrap();
        assert!(stored.is_assigned_to(process.assigned_executor_id.as_ref().unwrap()));
    }
    cluster.shutdown().await;
}

fn block_on(future: impl std::future::Future<Output = ()>) {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
        .block_on(future);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn distributed_nodes_assign_each_process_once(
        nodes in 1usize..4,
        executors in 1usize..6,
        processes in 0usize..24,
    ) {
        block_on(run_case(AssignmentMode::Distributed, nodes, executors, processes));
    }

    #[test]
    fn exclusive_leader_assigns_each_process_once(
        nodes in 1usize..4,
        executors in 1usize..6,
        processes in 0usize..24,
    ) {
        block_on(run_case(AssignmentMode::Exclusive, nodes, executors, processes));
    }
}

#[tokio::test]
async fn exclusive_follower_points_at_leader() {
    let cluster = Cluster::new(2, AssignmentMode::Exclusive);
    let executors = cluster.colony_with_executors(1).await;
    cluster.node(1).submit_process(spec()).await.unwrap();

    let result = cluster
        .node(1)
        .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
        .await;
    match result {
        Err(EngineError::NotLeader { leader }) => assert_eq!(leader.as_deref(), Some("n1")),
        other => panic!("expected NotLeader, got {:?}", other),
    }

    cluster
        .leader()
        .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn long_poll_on_one_node_sees_submit_on_another() {
    let cluster = Cluster::new(2, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(1).await;

    let (assigned, submitted) = tokio::join!(
        cluster.node(1).assign(
            &executors[0].id,
            COLONY,
            ResourceHints::default(),
            Some(Duration::from_secs(5)),
        ),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cluster.node(0).submit_process(spec()).await
        }
    );

    assert_eq!(assigned.unwrap().id, submitted.unwrap().id);
    assert_eq!(cluster.bus.subscriber_count(), 0);
}

#[tokio::test]
async fn priority_planner_prefers_urgent_work() {
    let cluster = Cluster::new(1, AssignmentMode::Exclusive);
    let executors = cluster.colony_with_executors(1).await;
    let node = cluster.leader();
    node.submit_process(spec().with_priority(1)).await.unwrap();
    let urgent = node.submit_process(spec().with_priority(9)).await.unwrap();
    node.submit_process(spec().with_priority(5)).await.unwrap();

    let first = node
        .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
        .await
        .unwrap();
    assert_eq!(first.id, urgent.id);
}

#[tokio::test]
async fn executor_name_and_resources_restrict_assignment() {
    let cluster = Cluster::new(1, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(2).await;
    let node = cluster.leader();
    let pinned = node
        .submit_process(spec().with_executor_names(vec!["worker-1"]))
        .await
        .unwrap();
    let heavy = node
        .submit_process(spec().with_resources(Some(4000), None))
        .await
        .unwrap();

    let small = ResourceHints::new(1000, 1024);
    let result = node.assign(&executors[0].id, COLONY, small, None).await;
    assert!(matches!(result, Err(EngineError::NoWorkAvailable)));

    let taken = node.assign(&executors[1].id, COLONY, small, None).await.unwrap();
    assert_eq!(taken.id, pinned.id);

    let big = ResourceHints::new(8000, 1024);
    let taken = node.assign(&executors[0].id, COLONY, big, None).await.unwrap();
    assert_eq!(taken.id, heavy.id);
}
