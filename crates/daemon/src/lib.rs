// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Colony server daemon (colonyd)
//!
//! Loads configuration, holds the pid lock and runs one cluster node until
//! it is signalled to stop.

mod config;
mod lifecycle;

pub use config::{Config, DaemonSection};
pub use lifecycle::{startup, DaemonController, DaemonState, LifecycleError, Status};
