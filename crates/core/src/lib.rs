// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! colony-core: domain types for the colony orchestration server
//!
//! This crate provides:
//! - Pure state machines for processes, process graphs and executors
//! - Workflow instantiation and validation
//! - Generator trigger arithmetic and cron schedules
//! - Server configuration

pub mod clock;
pub mod id;

pub mod config;
pub mod error;

// Domain types (order matters for dependencies)
pub mod attribute;
pub mod colony;
pub mod effect;
pub mod executor;
pub mod spec;
pub mod process;
pub mod graph;
pub mod workflow;
pub mod generator;
pub mod cron;
pub mod stats;

// Re-exports
pub use attribute::{Attribute, AttributeType};
pub use clock::{Clock, FakeClock, SystemClock};
pub use colony::Colony;
pub use config::{AssignmentMode, PlannerKind, ServerConfig};
pub use cron::{Cron, CronDecision, CronSchedule};
pub use effect::{Effect, Event};
pub use error::ValidationError;
pub use executor::{Executor, ExecutorState};
pub use generator::{Generator, GeneratorArg};
pub use graph::ProcessGraph;
pub use id::{
    AttributeId, CronId, ExecutorId, GeneratorId, IdGen, ProcessGraphId, ProcessId,
    SequentialIdGen, UuidIdGen,
};
pub use process::{Process, ProcessEvent, ProcessState, RetryDecision};
pub use spec::{Conditions, FunctionSpec, WorkflowSpec};
pub use stats::ColonyStatistics;
pub use workflow::{instantiate, InstantiatedWorkflow};
