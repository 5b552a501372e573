// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::{Controller, RuntimeDeps};
use colony_adapters::{FakeMembership, ProcessBus};
use colony_core::{
    AssignmentMode, Colony, Executor, FakeClock, FunctionSpec, SequentialIdGen, ServerConfig,
};
use colony_storage::MemoryStore;
use std::sync::Arc;

pub(crate) const COLONY: &str = "dev";

pub(crate) struct TestNode {
    pub controller: Controller<FakeClock, SequentialIdGen>,
    pub clock: FakeClock,
    pub store: Arc<MemoryStore>,
    pub membership: FakeMembership,
    pub bus: Arc<ProcessBus>,
}

pub(crate) fn config(name: &str, mode: AssignmentMode) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.node.name = name.to_string();
    config.assignment.mode = mode;
    config.crons.seed = Some(7);
    config
}

/// A single leader node with an empty store
pub(crate) fn node() -> TestNode {
    node_with(config("n1", AssignmentMode::Exclusive))
}

pub(crate) fn node_with(config: ServerConfig) -> TestNode {
    let clock = FakeClock::new();
    let store = Arc::new(MemoryStore::new());
    let membership = FakeMembership::with_nodes(&[config.node.name.as_str()]);
    membership.set_leader(Some(&config.node.name));
    let bus = Arc::new(ProcessBus::new());
    let deps = RuntimeDeps {
        store: store.clone(),
        membership: Arc::new(membership.clone()),
        bus: bus.clone(),
    };
    let controller = Controller::new(deps, config, clock.clone(), SequentialIdGen::new("id"));
    TestNode {
        controller,
        clock,
        store,
        membership,
        bus,
    }
}

impl TestNode {
    /// Create the test colony and one approved `cli` executor in it
    pub async fn with_executor(&self) -> Executor {
        self.controller
            .add_colony(Colony::new("", COLONY, "owner-key"))
            .await
            .unwrap();
        self.executor("worker-1").await
    }

    pub async fn executor(&self, name: &str) -> Executor {
        let executor = self
            .controller
            .add_executor(name, "cli", COLONY)
            .await
            .unwrap();
        self.controller.approve_executor(&executor.id).await.unwrap()
    }
}

pub(crate) fn spec() -> FunctionSpec {
    FunctionSpec::new(COLONY, "cli")
}
