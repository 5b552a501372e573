// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planners choose which waiting process an executor should get
//!
//! Selection is a pure preference over a candidate slice. The atomic claim in
//! the store decides who actually wins a process.

use colony_core::{ExecutorId, PlannerKind, Process};
use std::cmp::Ordering;

pub trait Planner: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn select<'a>(&self, executor_id: &ExecutorId, candidates: &'a [Process]) -> Option<&'a Process>;
}

/// Build the planner named in configuration
pub fn planner_for(kind: PlannerKind) -> Box<dyn Planner> {
    match kind {
        PlannerKind::Priority => Box::new(PriorityPlanner),
        PlannerKind::Fifo => Box::new(FifoPlanner),
        PlannerKind::Deadline => Box::new(DeadlinePlanner),
    }
}

fn fifo_order(a: &Process, b: &Process) -> Ordering {
    a.submission_time
        .cmp(&b.submission_time)
        .then_with(|| a.id.cmp(&b.id))
}

/// Oldest submission first
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoPlanner;

impl Planner for FifoPlanner {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn select<'a>(&self, _executor_id: &ExecutorId, candidates: &'a [Process]) -> Option<&'a Process> {
        candidates.iter().min_by(|a, b| fifo_order(a, b))
    }
}

/// Highest priority first, ties broken by submission order
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityPlanner;

impl Planner for PriorityPlanner {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn select<'a>(&self, _executor_id: &ExecutorId, candidates: &'a [Process]) -> Option<&'a Process> {
        candidates.iter().min_by(|a, b| {
            b.spec
                .priority
                .cmp(&a.spec.priority)
                .then_with(|| fifo_order(a, b))
        })
    }
}

/// Earliest wait deadline first; processes without one go last
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlinePlanner;

impl Planner for DeadlinePlanner {
    fn name(&self) -> &'static str {
        "deadline"
    }

    fn select<'a>(&self, _executor_id: &ExecutorId, candidates: &'a [Process]) -> Option<&'a Process> {
        candidates.iter().min_by(|a, b| {
            let by_deadline = match (a.wait_deadline, b.wait_deadline) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_deadline.then_with(|| fifo_order(a, b))
        })
    }
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
