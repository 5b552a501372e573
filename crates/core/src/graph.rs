// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process graphs (workflow instances)
//!
//! A graph holds ids only; edges live on the member processes as
//! parent/child id lists. The aggregate state is always derived from the
//! members, never set directly.

use crate::clock::Clock;
use crate::effect::Event;
use crate::id::{ProcessGraphId, ProcessId};
use crate::process::{Process, ProcessState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A workflow instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub id: ProcessGraphId,
    pub colony_name: String,
    pub root_process_ids: Vec<ProcessId>,
    pub process_ids: Vec<ProcessId>,
    pub state: ProcessState,
    pub submission_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Bumped by the store on every write
    pub revision: u64,
}

impl ProcessGraph {
    pub fn new(
        id: impl Into<ProcessGraphId>,
        colony_name: impl Into<String>,
        root_process_ids: Vec<ProcessId>,
        process_ids: Vec<ProcessId>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: id.into(),
            colony_name: colony_name.into(),
            root_process_ids,
            process_ids,
            state: ProcessState::Waiting,
            submission_time: clock.now(),
            start_time: None,
            end_time: None,
            revision: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Derive the aggregate state from member processes
    ///
    /// Failed if any member failed, Success once every member succeeded,
    /// Running once any member has left Waiting, otherwise Waiting.
    pub fn derive_state(members: &[Process]) -> ProcessState {
        if members.iter().any(|p| p.state == ProcessState::Failed) {
            ProcessState::Failed
        } else if !members.is_empty() && members.iter().all(|p| p.state == ProcessState::Success)
        {
            ProcessState::Success
        } else if members.iter().any(|p| p.state != ProcessState::Waiting) {
            ProcessState::Running
        } else {
            ProcessState::Waiting
        }
    }

    /// Re-derive the aggregate state, returning the updated graph and the
    /// event describing the change (if any)
    pub fn resolve(&self, members: &[Process], clock: &impl Clock) -> (ProcessGraph, Option<Event>) {
        let derived = Self::derive_state(members);
        if derived == self.state || self.is_terminal() {
            return (self.clone(), None);
        }

        let now = clock.now();
        let start_time = match derived {
            ProcessState::Waiting => self.start_time,
            _ => self.start_time.or(Some(now)),
        };
        let end_time = derived.is_terminal().then_some(now);
        let graph = ProcessGraph {
            state: derived,
            start_time,
            end_time,
            ..self.clone()
        };
        let event = match derived {
            ProcessState::Running => Some(Event::GraphRunning {
                id: self.id.clone(),
            }),
            ProcessState::Success => Some(Event::GraphSucceeded {
                id: self.id.clone(),
            }),
            ProcessState::Failed => Some(Event::GraphFailed {
                id: self.id.clone(),
            }),
            ProcessState::Waiting => None,
        };
        (graph, event)
    }

    /// Children of `closed` whose parents have all succeeded
    pub fn releasable_children<'a>(closed: &Process, members: &'a [Process]) -> Vec<&'a Process> {
        let by_id: HashMap<&ProcessId, &Process> = members.iter().map(|p| (&p.id, p)).collect();
        closed
            .children
            .iter()
            .filter_map(|child_id| by_id.get(child_id).copied())
            .filter(|child| child.wait_for_parents && child.state == ProcessState::Waiting)
            .filter(|child| {
                child.parents.iter().all(|parent_id| {
                    by_id
                        .get(parent_id)
                        .is_some_and(|parent| parent.state == ProcessState::Success)
                })
            })
            .collect()
    }

    /// Blocked processes that can never run because an ancestor failed,
    /// each paired with the failed process that dooms it
    pub fn doomed_descendants(members: &[Process]) -> Vec<(&Process, &ProcessId)> {
        let by_id: HashMap<&ProcessId, &Process> = members.iter().map(|p| (&p.id, p)).collect();
        let mut doomed: Vec<(&ProcessId, &ProcessId)> = Vec::new();
        let mut frontier: Vec<(&ProcessId, &ProcessId)> = members
            .iter()
            .filter(|p| p.state == ProcessState::Failed)
            .map(|p| (&p.id, &p.id))
            .collect();

        while let Some((id, cause)) = frontier.pop() {
            let Some(process) = by_id.get(id) else {
                continue;
            };
            for child_id in &process.children {
                if doomed.iter().any(|(d, _)| *d == child_id) {
                    continue;
                }
                if let Some(child) = by_id.get(child_id) {
                    if child.wait_for_parents && child.state == ProcessState::Waiting {
                        doomed.push((child_id, cause));
                        frontier.push((child_id, cause));
                    }
                }
            }
        }

        doomed
            .into_iter()
            .filter_map(|(id, cause)| by_id.get(id).map(|p| (*p, cause)))
            .collect()
    }

    /// Input for a released child: outputs of its parents, in parent order
    pub fn collect_parent_output(child: &Process, members: &[Process]) -> Vec<serde_json::Value> {
        child
            .parents
            .iter()
            .filter_map(|parent_id| members.iter().find(|p| &p.id == parent_id))
            .flat_map(|parent| parent.output.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
