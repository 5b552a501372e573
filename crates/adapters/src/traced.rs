// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::membership::{ClusterMembership, MembershipError, NodeInfo};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any ClusterMembership
#[derive(Clone)]
pub struct TracedMembership<M> {
    inner: M,
}

impl<M> TracedMembership<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<M: ClusterMembership> ClusterMembership for TracedMembership<M> {
    async fn current_leader(&self) -> Result<Option<NodeInfo>, MembershipError> {
        let start = std::time::Instant::now();
        let result = self.inner.current_leader().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(leader) => tracing::trace!(
                leader = leader.as_ref().map(|n| n.name.as_str()),
                elapsed_ms = elapsed.as_millis() as u64,
                "leader lookup"
            ),
            Err(e) => tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "leader lookup failed"
            ),
        }

        result
    }

    async fn nodes(&self) -> Result<Vec<NodeInfo>, MembershipError> {
        let result = self
            .inner
            .nodes()
            .instrument(tracing::info_span!("membership.nodes"))
            .await;
        match &result {
            Ok(nodes) => tracing::debug!(count = nodes.len(), "listed nodes"),
            Err(e) => tracing::warn!(error = %e, "node listing failed"),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
