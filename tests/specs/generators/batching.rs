// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generators packed on one node and fired by the leader

use crate::prelude::*;
use colony_core::{Cron, Generator};
use proptest::prelude::*;

fn workflow() -> WorkflowSpec {
    WorkflowSpec::new(COLONY)
        .with_spec(spec().with_node_name("fetch"))
        .with_spec(spec().with_node_name("store").with_dependencies(vec!["fetch"]))
}

async fn generator(cluster: &Cluster, trigger: u32, timeout: i64) -> Generator {
    cluster
        .node(1)
        .add_generator(Generator::new("", "ingest", workflow(), trigger, timeout))
        .await
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// `k*T + r` packed args fire `k` workflows of `T` args, leaving `r`
    #[test]
    fn packs_from_any_node_fire_whole_batches(
        trigger in 1u32..5,
        packed in 0usize..20,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (fired, roots, left) = runtime.block_on(async {
            let cluster = Cluster::new(2, AssignmentMode::Distributed);
            cluster.colony_with_executors(1).await;
            let generator = generator(&cluster, trigger, -1).await;
            for i in 0..packed {
                cluster
                    .node(i % 2)
                    .pack_generator(&generator.id, format!("item-{}", i))
                    .await
                    .unwrap();
            }

            let fired = cluster.leader().trigger_generators().await.unwrap();
            let mut roots = Vec::new();
            for graph in cluster.leader().get_process_graphs(COLONY, None).await.unwrap() {
                let root = cluster
                    .leader()
                    .get_process(&graph.root_process_ids[0])
                    .await
                    .unwrap();
                roots.push(root.spec.args.len());
            }
            let left = cluster.leader().trigger_generators().await.unwrap();
            cluster.shutdown().await;
            (fired, roots, left)
        });

        let trigger = trigger as usize;
        prop_assert_eq!(fired, packed / trigger);
        prop_assert!(roots.iter().all(|&n| n == trigger));
        prop_assert_eq!(left, 0);
    }
}

#[tokio::test]
async fn remainder_fires_after_timeout() {
    let cluster = Cluster::new(2, AssignmentMode::Distributed);
    cluster.colony_with_executors(1).await;
    let generator = generator(&cluster, 4, 30).await;
    for arg in ["a", "b", "c", "d", "e"] {
        cluster
            .node(1)
            .pack_generator(&generator.id, arg)
            .await
            .unwrap();
    }

    assert_eq!(cluster.leader().trigger_generators().await.unwrap(), 1);
    cluster.clock.advance(Duration::from_secs(10));
    assert_eq!(cluster.leader().trigger_generators().await.unwrap(), 0);
    cluster.clock.advance(Duration::from_secs(25));
    assert_eq!(cluster.leader().trigger_generators().await.unwrap(), 1);

    let graphs = cluster
        .leader()
        .get_process_graphs(COLONY, None)
        .await
        .unwrap();
    let mut sizes = Vec::new();
    for graph in &graphs {
        let root = cluster
            .leader()
            .get_process(&graph.root_process_ids[0])
            .await
            .unwrap();
        sizes.push(root.spec.args.len());
    }
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 4]);
}

#[tokio::test]
async fn cron_waits_for_its_previous_run() {
    let cluster = Cluster::new(2, AssignmentMode::Distributed);
    let executors = cluster.colony_with_executors(1).await;
    let cron = cluster
        .node(1)
        .add_cron(
            Cron::with_interval("", "nightly", 60, false, workflow()).waiting_for_previous(true),
        )
        .await
        .unwrap();

    let leader = cluster.leader();
    assert_eq!(leader.trigger_crons().await.unwrap(), 0);
    cluster.clock.advance(Duration::from_secs(60));
    assert_eq!(leader.trigger_crons().await.unwrap(), 1);
    cluster.clock.advance(Duration::from_secs(60));
    assert_eq!(leader.trigger_crons().await.unwrap(), 0);

    for _ in 0..2 {
        let process = cluster
            .node(1)
            .assign(&executors[0].id, COLONY, ResourceHints::default(), None)
            .await
            .unwrap();
        cluster
            .node(1)
            .close_successful(&process.id, &executors[0].id, vec![])
            .await
            .unwrap();
    }

    assert_eq!(leader.trigger_crons().await.unwrap(), 1);
    let fired = leader.get_cron(&cron.id).await.unwrap();
    assert_eq!(fired.last_run, Some(colony_core::Clock::now(&cluster.clock)));
}
