// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Colony orchestration engine
//!
//! One `Controller` per server node. Nodes share a `Store`, a
//! `ClusterMembership` and (within a process) an `EventBus`.

mod actor;
mod assign;
mod controller;
mod error;
mod leader;
mod node;
mod planner;
mod runtime;

#[cfg(test)]
mod test_helpers;

pub use actor::CommandActor;
pub use assign::{
    eligible, AssignmentStrategy, ClaimRequest, Claimed, DistributedAssignment,
    ExclusiveAssignment, ResourceHints,
};
pub use controller::Controller;
pub use error::EngineError;
pub use leader::LeaderTracker;
pub use node::NodeState;
pub use planner::{planner_for, DeadlinePlanner, FifoPlanner, Planner, PriorityPlanner};
pub use runtime::{ClusterInfo, RetentionReport, Runtime, RuntimeDeps, SweepReport};
