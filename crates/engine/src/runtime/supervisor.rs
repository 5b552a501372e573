// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout supervisor
//!
//! Runs on every node. Each sweep only touches processes whose deadlines
//! have passed, and every write is revision-checked, so concurrent sweeps on
//! several nodes apply each correction once.

use super::Runtime;
use crate::error::EngineError;
use colony_core::{Clock, IdGen, Process, ProcessEvent, ProcessGraph, ProcessState, RetryDecision};
use colony_storage::ProcessQuery;

/// What one sweep changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Running processes returned to the pool
    pub retried: usize,
    /// Processes failed for exceeding a deadline
    pub failed: usize,
    /// Blocked processes whose parents had all succeeded
    pub released: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == SweepReport::default()
    }
}

impl<C: Clock, I: IdGen> Runtime<C, I> {
    pub async fn sweep_timeouts(&self) -> Result<SweepReport, EngineError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let running = self
            .store
            .find_processes(&ProcessQuery::in_state(ProcessState::Running))
            .await?;
        for process in running.iter().filter(|p| p.exec_expired(now)) {
            let (event, retry) = match process.retry_decision() {
                RetryDecision::Retry => (ProcessEvent::Unassign, true),
                RetryDecision::Exhausted => (
                    ProcessEvent::Fail {
                        reason: "max execution time exceeded".to_string(),
                    },
                    false,
                ),
            };
            if self.sweep_transition(process, event).await? {
                if retry {
                    report.retried += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        let waiting = self
            .store
            .find_processes(&ProcessQuery::in_state(ProcessState::Waiting))
            .await?;
        for process in waiting.iter().filter(|p| p.wait_expired(now)) {
            let event = ProcessEvent::Fail {
                reason: "max wait time exceeded".to_string(),
            };
            if self.sweep_transition(process, event).await? {
                report.failed += 1;
            }
        }

        for process in waiting.iter().filter(|p| p.wait_for_parents) {
            if self.release_if_unblocked(process).await? {
                report.released += 1;
            }
        }

        if !report.is_empty() {
            tracing::info!(
                retried = report.retried,
                failed = report.failed,
                released = report.released,
                "timeout sweep"
            );
        }
        Ok(report)
    }

    /// Store one correction; a concurrent change to the process skips it
    async fn sweep_transition(&self, process: &Process, event: ProcessEvent) -> Result<bool, EngineError> {
        match self.store_transition(process, event).await {
            Ok(stored) => Ok(stored.is_some()),
            Err(EngineError::Conflict { .. }) | Err(EngineError::NotFound { .. }) => {
                tracing::debug!(process_id = %process.id, "process changed during sweep");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Release a blocked process whose parents all succeeded but whose
    /// release was lost to a race between closes on different nodes
    async fn release_if_unblocked(&self, process: &Process) -> Result<bool, EngineError> {
        let mut parents = Vec::with_capacity(process.parents.len());
        for parent_id in &process.parents {
            match self.store.get_process(parent_id).await? {
                Some(parent) if parent.state == ProcessState::Success => parents.push(parent),
                _ => return Ok(false),
            }
        }
        let input = ProcessGraph::collect_parent_output(process, &parents);
        self.sweep_transition(process, ProcessEvent::Release { input })
            .await
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
