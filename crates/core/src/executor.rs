// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor registration state machine
//!
//! Executors are created pending and must be approved by the colony owner
//! before they are handed work.

use crate::clock::Clock;
use crate::id::ExecutorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approval state of an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorState {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorState::Pending => write!(f, "pending"),
            ExecutorState::Approved => write!(f, "approved"),
            ExecutorState::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ExecutorState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExecutorState::Pending),
            "approved" => Ok(ExecutorState::Approved),
            "rejected" => Ok(ExecutorState::Rejected),
            _ => Err(format!("unknown executor state: {}", s)),
        }
    }
}

/// A worker identity bound to one colony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executor {
    pub id: ExecutorId,
    pub name: String,
    pub executor_type: String,
    pub colony_name: String,
    pub state: ExecutorState,
    pub commission_time: DateTime<Utc>,
    pub last_heard_from: DateTime<Utc>,
}

impl Executor {
    /// Register a new executor in the pending state
    pub fn new(
        id: impl Into<ExecutorId>,
        name: impl Into<String>,
        executor_type: impl Into<String>,
        colony_name: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.now();
        Self {
            id: id.into(),
            name: name.into(),
            executor_type: executor_type.into(),
            colony_name: colony_name.into(),
            state: ExecutorState::Pending,
            commission_time: now,
            last_heard_from: now,
        }
    }

    pub fn approve(&self) -> Self {
        Self {
            state: ExecutorState::Approved,
            ..self.clone()
        }
    }

    pub fn reject(&self) -> Self {
        Self {
            state: ExecutorState::Rejected,
            ..self.clone()
        }
    }

    /// Record contact from the executor
    pub fn heard_from(&self, clock: &impl Clock) -> Self {
        Self {
            last_heard_from: clock.now(),
            ..self.clone()
        }
    }

    pub fn is_approved(&self) -> bool {
        self.state == ExecutorState::Approved
    }
}
