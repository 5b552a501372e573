// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence interface consumed by the engine
//!
//! Every node of a cluster shares one store. Process writes are
//! revision-checked so concurrent writers on different nodes are
//! adjudicated here rather than by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colony_core::{
    Attribute, AttributeId, Colony, Cron, CronId, Executor, ExecutorId, Generator, GeneratorArg,
    GeneratorId, Process, ProcessGraph, ProcessGraphId, ProcessId, ProcessState,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
    /// A conditional write lost against a concurrent writer
    #[error("conflicting write to {kind} {id}")]
    Conflict { kind: &'static str, id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Filter for process listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessQuery {
    pub colony_name: Option<String>,
    pub state: Option<ProcessState>,
    pub executor_type: Option<String>,
    pub process_graph_id: Option<ProcessGraphId>,
    /// Only processes that are not members of a graph
    pub standalone: bool,
    /// Only terminal processes that ended before this time
    pub ended_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ProcessQuery {
    pub fn colony(colony_name: impl Into<String>) -> Self {
        Self {
            colony_name: Some(colony_name.into()),
            ..Self::default()
        }
    }

    pub fn in_state(state: ProcessState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: ProcessState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_executor_type(mut self, executor_type: impl Into<String>) -> Self {
        self.executor_type = Some(executor_type.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, process: &Process) -> bool {
        self.colony_name
            .as_ref()
            .is_none_or(|c| &process.colony_name == c)
            && self.state.is_none_or(|s| process.state == s)
            && self
                .executor_type
                .as_ref()
                .is_none_or(|t| &process.spec.conditions.executor_type == t)
            && self
                .process_graph_id
                .as_ref()
                .is_none_or(|g| process.process_graph_id.as_ref() == Some(g))
            && (!self.standalone || process.process_graph_id.is_none())
            && self.ended_before.is_none_or(|cutoff| {
                process.is_terminal() && process.end_time.is_some_and(|end| end < cutoff)
            })
    }
}

/// Abstract persistence over colonies, executors, processes, graphs,
/// attributes, generators and crons
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // Colonies
    async fn add_colony(&self, colony: Colony) -> Result<(), StoreError>;
    async fn get_colony(&self, name: &str) -> Result<Option<Colony>, StoreError>;
    async fn get_colonies(&self) -> Result<Vec<Colony>, StoreError>;
    /// Remove a colony and everything it owns
    async fn remove_colony(&self, name: &str) -> Result<(), StoreError>;
    async fn set_assignments_paused(&self, colony_name: &str, paused: bool) -> Result<(), StoreError>;
    async fn assignments_paused(&self, colony_name: &str) -> Result<bool, StoreError>;

    // Executors
    async fn add_executor(&self, executor: Executor) -> Result<(), StoreError>;
    async fn get_executor(&self, id: &ExecutorId) -> Result<Option<Executor>, StoreError>;
    async fn get_executors(&self, colony_name: &str) -> Result<Vec<Executor>, StoreError>;
    async fn update_executor(&self, executor: Executor) -> Result<(), StoreError>;
    async fn remove_executor(&self, id: &ExecutorId) -> Result<(), StoreError>;

    // Processes
    async fn add_process(&self, process: Process) -> Result<Process, StoreError>;
    async fn get_process(&self, id: &ProcessId) -> Result<Option<Process>, StoreError>;
    /// Matching processes ordered by submission time
    async fn find_processes(&self, query: &ProcessQuery) -> Result<Vec<Process>, StoreError>;
    /// Assignable processes for an executor type, ordered by submission time
    async fn find_candidates(
        &self,
        colony_name: &str,
        executor_type: &str,
        limit: usize,
    ) -> Result<Vec<Process>, StoreError>;
    /// Atomically store `process` (already transitioned to Running) only if
    /// the stored row is still assignable, unassigned and at the same
    /// revision. Returns the stored row.
    async fn claim_process(&self, process: &Process) -> Result<Process, StoreError>;
    /// Store `process` if the stored revision equals `process.revision`.
    /// Returns the stored row with the bumped revision.
    async fn update_process(&self, process: &Process) -> Result<Process, StoreError>;
    async fn remove_process(&self, id: &ProcessId) -> Result<(), StoreError>;
    async fn count_processes(
        &self,
        colony_name: &str,
        state: ProcessState,
    ) -> Result<usize, StoreError>;

    // Process graphs
    /// Store a graph and all of its members in one step
    async fn add_process_graph(
        &self,
        graph: ProcessGraph,
        processes: Vec<Process>,
    ) -> Result<(), StoreError>;
    async fn get_process_graph(&self, id: &ProcessGraphId) -> Result<Option<ProcessGraph>, StoreError>;
    async fn get_process_graphs(
        &self,
        colony_name: &str,
        state: Option<ProcessState>,
    ) -> Result<Vec<ProcessGraph>, StoreError>;
    /// Replace a graph, failing with `Conflict` if its revision is stale
    async fn update_process_graph(&self, graph: &ProcessGraph) -> Result<ProcessGraph, StoreError>;
    /// Remove a graph together with its member processes
    async fn remove_process_graph(&self, id: &ProcessGraphId) -> Result<(), StoreError>;
    async fn count_process_graphs(
        &self,
        colony_name: &str,
        state: ProcessState,
    ) -> Result<usize, StoreError>;

    // Attributes
    async fn add_attribute(&self, attribute: Attribute) -> Result<(), StoreError>;
    async fn get_attribute(&self, id: &AttributeId) -> Result<Option<Attribute>, StoreError>;
    async fn get_attributes(&self, target_id: &ProcessId) -> Result<Vec<Attribute>, StoreError>;

    // Generators
    async fn add_generator(&self, generator: Generator) -> Result<(), StoreError>;
    async fn get_generator(&self, id: &GeneratorId) -> Result<Option<Generator>, StoreError>;
    async fn get_generators(&self, colony_name: &str) -> Result<Vec<Generator>, StoreError>;
    async fn get_all_generators(&self) -> Result<Vec<Generator>, StoreError>;
    async fn update_generator(&self, generator: Generator) -> Result<(), StoreError>;
    /// Remove a generator and its pending args
    async fn remove_generator(&self, id: &GeneratorId) -> Result<(), StoreError>;
    /// Append one arg; the store assigns the sequence number
    async fn add_generator_arg(
        &self,
        generator_id: &GeneratorId,
        arg: String,
        added: DateTime<Utc>,
    ) -> Result<GeneratorArg, StoreError>;
    /// Pending args in sequence order
    async fn get_generator_args(
        &self,
        generator_id: &GeneratorId,
        limit: Option<usize>,
    ) -> Result<Vec<GeneratorArg>, StoreError>;
    async fn count_generator_args(&self, generator_id: &GeneratorId) -> Result<usize, StoreError>;
    async fn remove_generator_args(
        &self,
        generator_id: &GeneratorId,
        seqs: &[u64],
    ) -> Result<(), StoreError>;

    // Crons
    async fn add_cron(&self, cron: Cron) -> Result<(), StoreError>;
    async fn get_cron(&self, id: &CronId) -> Result<Option<Cron>, StoreError>;
    async fn get_crons(&self, colony_name: &str) -> Result<Vec<Cron>, StoreError>;
    async fn get_all_crons(&self) -> Result<Vec<Cron>, StoreError>;
    async fn update_cron(&self, cron: Cron) -> Result<(), StoreError>;
    async fn remove_cron(&self, id: &CronId) -> Result<(), StoreError>;
}
