// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime: the operation handlers run by the command loop
//!
//! Handlers make their store calls in sequence and publish every stored
//! process change on the event bus. They never call back into the command
//! loop.

mod colonies;
mod crons;
mod effects;
mod generators;
mod processes;
mod retention;
mod supervisor;
mod workflows;

pub use retention::RetentionReport;
pub use supervisor::SweepReport;

use crate::assign::{AssignmentStrategy, DistributedAssignment, ExclusiveAssignment};
use crate::error::EngineError;
use crate::leader::LeaderTracker;
use crate::node::NodeState;
use crate::planner::{planner_for, Planner};
use colony_adapters::{ClusterMembership, EventBus, NodeInfo};
use colony_core::{AssignmentMode, Clock, IdGen, ServerConfig};
use colony_storage::Store;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

/// Collaborators the runtime is built from
pub struct RuntimeDeps {
    pub store: Arc<dyn Store>,
    pub membership: Arc<dyn ClusterMembership>,
    pub bus: Arc<dyn EventBus>,
}

/// Cluster roster and the current leader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub nodes: Vec<NodeInfo>,
    pub leader: Option<NodeInfo>,
}

pub struct Runtime<C: Clock, I: IdGen> {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    leader: Arc<LeaderTracker>,
    node: Arc<NodeState>,
    assigner: Box<dyn AssignmentStrategy>,
    planner: Box<dyn Planner>,
    config: ServerConfig,
    clock: C,
    ids: I,
    rng: Mutex<StdRng>,
}

impl<C: Clock, I: IdGen> Runtime<C, I> {
    pub fn new(deps: RuntimeDeps, config: ServerConfig, clock: C, ids: I) -> Self {
        let node = Arc::new(NodeState::new(config.node.name.clone()));
        let leader = Arc::new(LeaderTracker::new(deps.membership, Arc::clone(&node)));
        let assigner: Box<dyn AssignmentStrategy> = match config.assignment.mode {
            AssignmentMode::Exclusive => Box::new(ExclusiveAssignment::new(Arc::clone(&leader))),
            AssignmentMode::Distributed => Box::new(DistributedAssignment::new(
                config.assignment.max_claim_attempts,
            )),
        };
        let rng = match config.crons.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::debug!(
            node = node.name(),
            mode = ?config.assignment.mode,
            planner = ?config.assignment.planner,
            "runtime created"
        );

        Self {
            store: deps.store,
            bus: deps.bus,
            leader,
            node,
            assigner,
            planner: planner_for(config.assignment.planner),
            config,
            clock,
            ids,
            rng: Mutex::new(rng),
        }
    }

    pub fn node(&self) -> &Arc<NodeState> {
        &self.node
    }

    pub fn leader(&self) -> &Arc<LeaderTracker> {
        &self.leader
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn cluster_info(&self) -> Result<ClusterInfo, EngineError> {
        Ok(ClusterInfo {
            nodes: self.leader.nodes().await?,
            leader: self.leader.current_leader().await?,
        })
    }

    async fn require_colony(&self, name: &str) -> Result<(), EngineError> {
        match self.store.get_colony(name).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::not_found("colony", name)),
        }
    }
}
