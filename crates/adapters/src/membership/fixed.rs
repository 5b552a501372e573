// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Membership from a static roster

use super::{ClusterMembership, MembershipError, NodeInfo};
use async_trait::async_trait;
use colony_core::ServerConfig;

/// Fixed roster with a configured leader
#[derive(Debug, Clone)]
pub struct StaticMembership {
    nodes: Vec<NodeInfo>,
    leader: Option<String>,
}

impl StaticMembership {
    pub fn new(nodes: Vec<NodeInfo>, leader: Option<String>) -> Self {
        Self { nodes, leader }
    }

    /// Roster from config; the local node leads unless `cluster.leader` names another
    pub fn from_config(config: &ServerConfig) -> Self {
        let nodes = config.roster().iter().map(NodeInfo::from).collect();
        let leader = config
            .cluster
            .leader
            .clone()
            .unwrap_or_else(|| config.node.name.clone());
        Self::new(nodes, Some(leader))
    }
}

#[async_trait]
impl ClusterMembership for StaticMembership {
    async fn current_leader(&self) -> Result<Option<NodeInfo>, MembershipError> {
        Ok(self
            .leader
            .as_ref()
            .and_then(|name| self.nodes.iter().find(|n| &n.name == name))
            .cloned())
    }

    async fn nodes(&self) -> Result<Vec<NodeInfo>, MembershipError> {
        Ok(self.nodes.clone())
    }
}
