// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake membership for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClusterMembership, MembershipError, NodeInfo};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct FakeState {
    nodes: Vec<NodeInfo>,
    leader: Option<String>,
    unavailable: bool,
    leader_queries: usize,
}

/// Shared, mutable membership; clones observe the same leader
#[derive(Clone, Default)]
pub struct FakeMembership {
    state: Arc<Mutex<FakeState>>,
}

impl FakeMembership {
    /// Roster of the named nodes on localhost, no leader elected
    pub fn with_nodes(names: &[&str]) -> Self {
        let nodes = names
            .iter()
            .enumerate()
            .map(|(i, name)| NodeInfo::new(*name, "localhost", 50080 + i as u16))
            .collect();
        Self {
            state: Arc::new(Mutex::new(FakeState {
                nodes,
                ..FakeState::default()
            })),
        }
    }

    /// Move leadership to `name` (or to no one)
    pub fn set_leader(&self, name: Option<&str>) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).leader = name.map(str::to_string);
    }

    /// Make every query fail until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).unavailable = unavailable;
    }

    /// Number of leader lookups served
    pub fn leader_queries(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .leader_queries
    }
}

#[async_trait]
impl ClusterMembership for FakeMembership {
    async fn current_leader(&self) -> Result<Option<NodeInfo>, MembershipError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.unavailable {
            return Err(MembershipError::Unavailable("fake outage".into()));
        }
        state.leader_queries += 1;
        let leader = state.leader.clone();
        Ok(leader.map(|name| {
            state
                .nodes
                .iter()
                .find(|n| n.name == name)
                .cloned()
                .unwrap_or_else(|| NodeInfo::new(name, "localhost", 0))
        }))
    }

    async fn nodes(&self) -> Result<Vec<NodeInfo>, MembershipError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.unavailable {
            return Err(MembershipError::Unavailable("fake outage".into()));
        }
        Ok(state.nodes.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
