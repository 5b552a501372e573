// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process state machine
//!
//! A process is the mutable execution record of one submitted function spec.
//! Transitions are pure: they return the next record and the effects the
//! engine must carry out. Invalid transitions are no-ops.
//!
//! Invariant: `assigned_executor_id` is set iff the state is `Running`.

use crate::clock::{add_secs, Clock};
use crate::effect::{Effect, Event};
use crate::id::{ExecutorId, ProcessGraphId, ProcessId};
use crate::spec::FunctionSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a process (also used as the aggregate graph state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Waiting,
    Running,
    Success,
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Success | ProcessState::Failed)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Waiting => write!(f, "waiting"),
            ProcessState::Running => write!(f, "running"),
            ProcessState::Success => write!(f, "success"),
            ProcessState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ProcessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(ProcessState::Waiting),
            "running" => Ok(ProcessState::Running),
            "success" => Ok(ProcessState::Success),
            "failed" => Ok(ProcessState::Failed),
            _ => Err(format!("unknown process state: {}", s)),
        }
    }
}

/// What to do with a process whose attempt ended without a close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the process to the waiting pool
    Retry,
    /// Retry budget is used up, fail the process
    Exhausted,
}

/// Events that can change process state
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Hand the process to an executor
    Assign { executor_id: ExecutorId },
    /// All parents succeeded, make the process assignable
    Release { input: Vec<serde_json::Value> },
    /// The assigned executor finished the work
    CloseSuccessful { output: Vec<serde_json::Value> },
    /// The assigned executor reported failure
    CloseFailed { errors: Vec<String> },
    /// Take the process back from its executor (counts as one retry)
    Unassign,
    /// Forced failure (deadline exceeded, dependency failed)
    Fail { reason: String },
}

/// The execution record of a function spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub colony_name: String,
    pub spec: FunctionSpec,
    pub state: ProcessState,
    pub assigned_executor_id: Option<ExecutorId>,
    pub retries: u32,
    pub submission_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub exec_deadline: Option<DateTime<Utc>>,
    pub wait_deadline: Option<DateTime<Utc>>,
    /// Held out of the assignable pool until every parent succeeds
    pub wait_for_parents: bool,
    pub process_graph_id: Option<ProcessGraphId>,
    pub parents: Vec<ProcessId>,
    pub children: Vec<ProcessId>,
    pub input: Vec<serde_json::Value>,
    pub output: Vec<serde_json::Value>,
    pub errors: Vec<String>,
    /// Bumped by the store on every write
    pub revision: u64,
}

impl Process {
    /// Create a standalone process in the Waiting state
    pub fn new(id: impl Into<ProcessId>, spec: FunctionSpec, clock: &impl Clock) -> Self {
        let now = clock.now();
        let wait_deadline = spec
            .wait_time_limited()
            .then(|| add_secs(now, spec.max_wait_time));
        Self {
            id: id.into(),
            colony_name: spec.conditions.colony_name.clone(),
            spec,
            state: ProcessState::Waiting,
            assigned_executor_id: None,
            retries: 0,
            submission_time: now,
            start_time: None,
            end_time: None,
            exec_deadline: None,
            wait_deadline,
            wait_for_parents: false,
            process_graph_id: None,
            parents: Vec::new(),
            children: Vec::new(),
            input: Vec::new(),
            output: Vec::new(),
            errors: Vec::new(),
            revision: 0,
        }
    }

    /// Attach the process to a graph with the given edges
    ///
    /// A process with parents starts blocked and has no wait deadline until
    /// it is released.
    pub fn in_graph(
        self,
        graph_id: ProcessGraphId,
        parents: Vec<ProcessId>,
        children: Vec<ProcessId>,
    ) -> Self {
        let blocked = !parents.is_empty();
        Self {
            process_graph_id: Some(graph_id),
            wait_for_parents: blocked,
            wait_deadline: if blocked { None } else { self.wait_deadline },
            parents,
            children,
            ..self
        }
    }

    /// Waiting and not blocked on parents
    pub fn is_assignable(&self) -> bool {
        self.state == ProcessState::Waiting && !self.wait_for_parents
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_assigned_to(&self, executor_id: &ExecutorId) -> bool {
        self.assigned_executor_id.as_ref() == Some(executor_id)
    }

    /// Running past its exec deadline
    pub fn exec_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_running() && self.exec_deadline.is_some_and(|deadline| now > deadline)
    }

    /// Assignable but never picked up before its wait deadline
    pub fn wait_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_assignable() && self.wait_deadline.is_some_and(|deadline| now > deadline)
    }

    /// Retry policy shared by the timeout sweep and explicit unassign
    pub fn retry_decision(&self) -> RetryDecision {
        let max = self.spec.max_retries;
        if max >= 0 && i64::from(self.retries) >= i64::from(max) {
            RetryDecision::Exhausted
        } else {
            RetryDecision::Retry
        }
    }

    fn graph_effect(&self) -> Option<Effect> {
        self.process_graph_id
            .as_ref()
            .map(|graph_id| Effect::ResolveGraph {
                graph_id: graph_id.clone(),
            })
    }

    /// Pure transition function - returns new state and effects
    pub fn transition(&self, event: ProcessEvent, clock: &impl Clock) -> (Process, Vec<Effect>) {
        let now = clock.now();

        match (self.state, event) {
            // Waiting → Running
            (ProcessState::Waiting, ProcessEvent::Assign { executor_id }) if !self.wait_for_parents => {
                let exec_deadline = self
                    .spec
                    .exec_time_limited()
                    .then(|| add_secs(now, self.spec.max_exec_time));
                let process = Process {
                    state: ProcessState::Running,
                    assigned_executor_id: Some(executor_id.clone()),
                    start_time: Some(now),
                    exec_deadline,
                    wait_deadline: None,
                    ..self.clone()
                };
                let mut effects = vec![Effect::Emit(Event::ProcessAssigned {
                    id: self.id.clone(),
                    executor_id,
                })];
                effects.extend(self.graph_effect());
                (process, effects)
            }

            // Blocked → assignable
            (ProcessState::Waiting, ProcessEvent::Release { input }) if self.wait_for_parents => {
                let wait_deadline = self
                    .spec
                    .wait_time_limited()
                    .then(|| add_secs(now, self.spec.max_wait_time));
                let process = Process {
                    wait_for_parents: false,
                    input,
                    wait_deadline,
                    ..self.clone()
                };
                let effects = vec![Effect::Emit(Event::ProcessReleased {
                    id: self.id.clone(),
                })];
                (process, effects)
            }

            // Running → Success
            (ProcessState::Running, ProcessEvent::CloseSuccessful { output }) => {
                let process = Process {
                    state: ProcessState::Success,
                    assigned_executor_id: None,
                    end_time: Some(now),
                    exec_deadline: None,
                    output,
                    ..self.clone()
                };
                let mut effects = vec![Effect::Emit(Event::ProcessSucceeded {
                    id: self.id.clone(),
                })];
                if self.process_graph_id.is_some() {
                    effects.push(Effect::ReleaseChildren {
                        process_id: self.id.clone(),
                    });
                }
                effects.extend(self.graph_effect());
                (process, effects)
            }

            // Running → Failed
            (ProcessState::Running, ProcessEvent::CloseFailed { errors }) => {
                let reason = errors.join("; ");
                let mut all_errors = self.errors.clone();
                all_errors.extend(errors);
                let process = Process {
                    state: ProcessState::Failed,
                    assigned_executor_id: None,
                    end_time: Some(now),
                    exec_deadline: None,
                    errors: all_errors,
                    ..self.clone()
                };
                let mut effects = vec![Effect::Emit(Event::ProcessFailed {
                    id: self.id.clone(),
                    reason,
                })];
                effects.extend(self.graph_effect());
                (process, effects)
            }

            // Running → Waiting (one retry used)
            (ProcessState::Running, ProcessEvent::Unassign) => {
                let retries = self.retries + 1;
                let wait_deadline = self
                    .spec
                    .wait_time_limited()
                    .then(|| add_secs(now, self.spec.max_wait_time));
                let process = Process {
                    state: ProcessState::Waiting,
                    assigned_executor_id: None,
                    retries,
                    start_time: None,
                    exec_deadline: None,
                    wait_deadline,
                    ..self.clone()
                };
                let effects = vec![Effect::Emit(Event::ProcessUnassigned {
                    id: self.id.clone(),
                    retries,
                })];
                (process, effects)
            }

            // Waiting/Running → Failed (forced)
            (ProcessState::Waiting | ProcessState::Running, ProcessEvent::Fail { reason }) => {
                let mut errors = self.errors.clone();
                errors.push(reason.clone());
                let process = Process {
                    state: ProcessState::Failed,
                    assigned_executor_id: None,
                    end_time: Some(now),
                    exec_deadline: None,
                    wait_deadline: None,
                    errors,
                    ..self.clone()
                };
                let mut effects = vec![Effect::Emit(Event::ProcessFailed {
                    id: self.id.clone(),
                    reason,
                })];
                effects.extend(self.graph_effect());
                (process, effects)
            }

            // Invalid transitions - no change
            _ => (self.clone(), vec![]),
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
