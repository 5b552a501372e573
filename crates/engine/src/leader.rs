// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leadership tracking on top of cluster membership
//!
//! Voting is left to the membership collaborator; this only compares the
//! reported leader against the local node name.

use crate::error::EngineError;
use crate::node::NodeState;
use colony_adapters::{ClusterMembership, NodeInfo};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct LeaderTracker {
    membership: Arc<dyn ClusterMembership>,
    node: Arc<NodeState>,
    guard: Mutex<()>,
}

impl LeaderTracker {
    pub fn new(membership: Arc<dyn ClusterMembership>, node: Arc<NodeState>) -> Self {
        Self {
            membership,
            node,
            guard: Mutex::new(()),
        }
    }

    pub fn node_name(&self) -> &str {
        self.node.name()
    }

    pub async fn current_leader(&self) -> Result<Option<NodeInfo>, EngineError> {
        Ok(self.membership.current_leader().await?)
    }

    pub async fn nodes(&self) -> Result<Vec<NodeInfo>, EngineError> {
        Ok(self.membership.nodes().await?)
    }

    /// Live check against membership, bypassing the cached flag
    pub async fn is_leader(&self) -> Result<bool, EngineError> {
        let leader = self.current_leader().await?;
        Ok(leader.is_some_and(|l| l.name == self.node.name()))
    }

    /// Refresh the cached leadership flag and log transitions
    ///
    /// A membership outage counts as not being leader.
    pub async fn try_become_leader(&self) -> bool {
        let _guard = self.guard.lock().await;
        let leader = match self.is_leader().await {
            Ok(leader) => leader,
            Err(e) => {
                tracing::warn!(node = self.node.name(), error = %e, "leader lookup failed");
                false
            }
        };

        let was_leader = self.node.set_leader(leader);
        match (was_leader, leader) {
            (false, true) => tracing::info!(node = self.node.name(), "became leader"),
            (true, false) => tracing::info!(node = self.node.name(), "ceased to be leader"),
            _ => {}
        }
        leader
    }
}
