// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment strategies
//!
//! Exclusive mode only lets the leader run select-and-claim, so claims on
//! one node are serialized by its command loop. Distributed mode lets every
//! node claim and relies on the store's conditional claim to pick a winner.

use crate::error::EngineError;
use crate::leader::LeaderTracker;
use crate::planner::Planner;
use async_trait::async_trait;
use colony_core::{AssignmentMode, Conditions, Effect, Executor, Process};
use colony_storage::Store;
use std::sync::Arc;

/// Resources an executor reports when asking for work
///
/// A dimension the executor does not report is not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceHints {
    pub cpu_millis: Option<u64>,
    pub memory_mib: Option<u64>,
}

impl ResourceHints {
    pub fn new(cpu_millis: u64, memory_mib: u64) -> Self {
        Self {
            cpu_millis: Some(cpu_millis),
            memory_mib: Some(memory_mib),
        }
    }

    pub fn satisfies(&self, conditions: &Conditions) -> bool {
        fits(conditions.min_cpu_millis, self.cpu_millis)
            && fits(conditions.min_memory_mib, self.memory_mib)
    }
}

fn fits(needed: Option<u64>, available: Option<u64>) -> bool {
    match (needed, available) {
        (Some(needed), Some(available)) => needed <= available,
        _ => true,
    }
}

/// Whether `executor` may run `process`
pub fn eligible(process: &Process, executor: &Executor, hints: &ResourceHints) -> bool {
    let conditions = &process.spec.conditions;
    process.is_assignable()
        && process.colony_name == executor.colony_name
        && conditions.executor_type == executor.executor_type
        && (conditions.executor_names.is_empty()
            || conditions.executor_names.contains(&executor.name))
        && hints.satisfies(conditions)
}

/// Builds the running record for a chosen candidate
pub type AssignFn<'a> = &'a (dyn Fn(&Process) -> (Process, Vec<Effect>) + Send + Sync);

/// Everything a strategy needs for one select-and-claim
pub struct ClaimRequest<'a> {
    pub executor: &'a Executor,
    pub hints: ResourceHints,
    /// Waiting processes fetched per attempt
    pub batch: usize,
    pub planner: &'a dyn Planner,
    pub store: &'a dyn Store,
    pub assign: AssignFn<'a>,
}

/// A successful claim: the stored running process and the effects of assigning it
#[derive(Debug)]
pub struct Claimed {
    pub process: Process,
    pub effects: Vec<Effect>,
}

#[async_trait]
pub trait AssignmentStrategy: Send + Sync + 'static {
    fn mode(&self) -> AssignmentMode;

    async fn claim(&self, request: ClaimRequest<'_>) -> Result<Claimed, EngineError>;
}

async fn eligible_candidates(request: &ClaimRequest<'_>) -> Result<Vec<Process>, EngineError> {
    let executor = request.executor;
    let found = request
        .store
        .find_candidates(&executor.colony_name, &executor.executor_type, request.batch)
        .await?;
    Ok(found
        .into_iter()
        .filter(|p| eligible(p, executor, &request.hints))
        .collect())
}

async fn try_claim(request: &ClaimRequest<'_>, chosen: &Process) -> Result<Claimed, EngineError> {
    let (running, effects) = (request.assign)(chosen);
    let process = request.store.claim_process(&running).await?;
    Ok(Claimed { process, effects })
}

/// Leader-only select-and-claim
pub struct ExclusiveAssignment {
    leader: Arc<LeaderTracker>,
}

impl ExclusiveAssignment {
    pub fn new(leader: Arc<LeaderTracker>) -> Self {
        Self { leader }
    }
}

#[async_trait]
impl AssignmentStrategy for ExclusiveAssignment {
    fn mode(&self) -> AssignmentMode {
        AssignmentMode::Exclusive
    }

    async fn claim(&self, request: ClaimRequest<'_>) -> Result<Claimed, EngineError> {
        let leader = self.leader.current_leader().await?.map(|n| n.name);
        if leader.as_deref() != Some(self.leader.node_name()) {
            return Err(EngineError::NotLeader { leader });
        }

        let candidates = eligible_candidates(&request).await?;
        let chosen = request
            .planner
            .select(&request.executor.id, &candidates)
            .ok_or(EngineError::NoWorkAvailable)?;
        try_claim(&request, chosen).await
    }
}

/// Select-and-claim on any node, retrying after lost races
pub struct DistributedAssignment {
    max_attempts: usize,
}

impl DistributedAssignment {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl AssignmentStrategy for DistributedAssignment {
    fn mode(&self) -> AssignmentMode {
        AssignmentMode::Distributed
    }

    async fn claim(&self, request: ClaimRequest<'_>) -> Result<Claimed, EngineError> {
        for attempt in 1..=self.max_attempts {
            let mut candidates = eligible_candidates(&request).await?;
            if candidates.is_empty() {
                return Err(EngineError::NoWorkAvailable);
            }

            while let Some(chosen) = request.planner.select(&request.executor.id, &candidates) {
                let chosen = chosen.clone();
                match try_claim(&request, &chosen).await {
                    Ok(claimed) => return Ok(claimed),
                    Err(EngineError::Conflict { .. }) => {
                        tracing::debug!(attempt, process_id = %chosen.id, "claim lost to another node");
                        candidates.retain(|p| p.id != chosen.id);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Err(EngineError::NoWorkAvailable)
    }
}

#[cfg(test)]
#[path = "assign_tests.rs"]
mod tests;
