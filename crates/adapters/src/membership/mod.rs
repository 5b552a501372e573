// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster membership adapters
//!
//! Voting and liveness belong to the membership service; the engine only
//! asks who leads and who is in the roster.

mod fixed;

pub use fixed::StaticMembership;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeMembership;

use async_trait::async_trait;
use thiserror::Error;

/// A cluster node as reported by membership
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeInfo {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

impl From<&colony_core::config::NodeConfig> for NodeInfo {
    fn from(node: &colony_core::config::NodeConfig) -> Self {
        Self::new(node.name.clone(), node.host.clone(), node.port)
    }
}

/// Errors from membership queries
#[derive(Debug, Clone, Error)]
pub enum MembershipError {
    #[error("membership unavailable: {0}")]
    Unavailable(String),
}

/// Source of leadership and roster information
#[async_trait]
pub trait ClusterMembership: Send + Sync + 'static {
    /// The node currently holding leadership, if one is elected
    async fn current_leader(&self) -> Result<Option<NodeInfo>, MembershipError>;

    /// Every node in the cluster
    async fn nodes(&self) -> Result<Vec<NodeInfo>, MembershipError>;
}
