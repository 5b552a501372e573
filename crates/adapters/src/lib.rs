// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the collaborators around the engine: cluster membership
//! and process change notification

pub mod bus;
pub mod membership;
pub mod traced;

pub use bus::{EventBus, ProcessBus, ProcessFilter, ProcessReceiver, SubscriberId, Subscription};
pub use membership::{ClusterMembership, MembershipError, NodeInfo, StaticMembership};
pub use traced::TracedMembership;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use membership::FakeMembership;
