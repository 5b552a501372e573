// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared cluster harness for specs

pub use std::sync::Arc;
pub use std::time::Duration;

pub use colony_adapters::{FakeMembership, ProcessBus};
pub use colony_core::{
    AssignmentMode, Colony, Executor, FakeClock, FunctionSpec, Process, ProcessState,
    SequentialIdGen, ServerConfig, WorkflowSpec,
};
pub use colony_engine::{Controller, EngineError, ResourceHints, RuntimeDeps};
pub use colony_storage::MemoryStore;

pub const COLONY: &str = "shared";

pub type Node = Controller<FakeClock, SequentialIdGen>;

/// Several nodes over one store, one membership and one event bus
pub struct Cluster {
    pub nodes: Vec<Node>,
    pub clock: FakeClock,
    pub store: Arc<MemoryStore>,
    pub membership: FakeMembership,
    pub bus: Arc<ProcessBus>,
}

pub fn node_name(index: usize) -> String {
    format!("n{}", index + 1)
}

fn node_config(index: usize, mode: AssignmentMode, tweak: &impl Fn(&mut ServerConfig)) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.node.name = node_name(index);
    config.assignment.mode = mode;
    config.crons.seed = Some(11);
    tweak(&mut config);
    config
}

impl Cluster {
    /// Nodes without background loops; `n1` leads
    pub fn new(size: usize, mode: AssignmentMode) -> Self {
        let harness = Harness::new(size);
        let nodes = (0..size)
            .map(|i| {
                Controller::new(
                    harness.deps(),
                    node_config(i, mode, &|_| {}),
                    harness.clock.clone(),
                    harness.ids.clone(),
                )
            })
            .collect();
        harness.into_cluster(nodes)
    }

    /// Nodes with their background loops running; `n1` leads
    pub async fn started(
        size: usize,
        mode: AssignmentMode,
        tweak: impl Fn(&mut ServerConfig),
    ) -> Self {
        let harness = Harness::new(size);
        let mut nodes = Vec::with_capacity(size);
        for i in 0..size {
            nodes.push(
                Controller::start(
                    harness.deps(),
                    node_config(i, mode, &tweak),
                    harness.clock.clone(),
                    harness.ids.clone(),
                )
                .await,
            );
        }
        harness.into_cluster(nodes)
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn leader(&self) -> &Node {
        self.node(0)
    }

    /// Create the shared colony with `count` approved `cli` executors
    pub async fn colony_with_executors(&self, count: usize) -> Vec<Executor> {
        let node = self.leader();
        node.add_colony(Colony::new("", COLONY, "owner-key"))
            .await
            .unwrap();
        let mut executors = Vec::with_capacity(count);
        for i in 0..count {
            let executor = node
                .add_executor(&format!("worker-{}", i), "cli", COLONY)
                .await
                .unwrap();
            executors.push(node.approve_executor(&executor.id).await.unwrap());
        }
        executors
    }

    pub async fn shutdown(&self) {
        for node in &self.nodes {
            node.shutdown().await;
        }
    }
}

struct Harness {
    clock: FakeClock,
    ids: SequentialIdGen,
    store: Arc<MemoryStore>,
    membership: FakeMembership,
    bus: Arc<ProcessBus>,
}

impl Harness {
    fn new(size: usize) -> Self {
        let names: Vec<String> = (0..size).map(node_name).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let membership = FakeMembership::with_nodes(&refs);
        membership.set_leader(Some("n1"));
        Self {
            clock: FakeClock::new(),
            ids: SequentialIdGen::new("id"),
            store: Arc::new(MemoryStore::new()),
            membership,
            bus: Arc::new(ProcessBus::new()),
        }
    }

    fn deps(&self) -> RuntimeDeps {
        RuntimeDeps {
            store: self.store.clone(),
            membership: Arc::new(self.membership.clone()),
            bus: self.bus.clone(),
        }
    }

    fn into_cluster(self, nodes: Vec<Node>) -> Cluster {
        Cluster {
            nodes,
            clock: self.clock,
            store: self.store,
            membership: self.membership,
            bus: self.bus,
        }
    }
}

pub fn spec() -> FunctionSpec {
    FunctionSpec::new(COLONY, "cli")
}

/// Poll `check` until it returns true or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
