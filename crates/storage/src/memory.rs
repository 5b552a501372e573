// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store
//!
//! All tables live behind one mutex, so every trait call is atomic. Share a
//! single `Arc<MemoryStore>` between nodes to model a cluster.

use crate::store::{ProcessQuery, Store, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colony_core::{
    Attribute, AttributeId, Colony, Cron, CronId, Executor, ExecutorId, Generator, GeneratorArg,
    GeneratorId, Process, ProcessGraph, ProcessGraphId, ProcessId, ProcessState,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    colonies: HashMap<String, Colony>,
    paused: HashSet<String>,
    executors: HashMap<ExecutorId, Executor>,
    processes: HashMap<ProcessId, Process>,
    graphs: HashMap<ProcessGraphId, ProcessGraph>,
    attributes: HashMap<AttributeId, Attribute>,
    generators: HashMap<GeneratorId, Generator>,
    generator_args: HashMap<GeneratorId, BTreeMap<u64, GeneratorArg>>,
    next_arg_seq: u64,
    crons: HashMap<CronId, Cron>,
}

impl Tables {
    fn sorted_processes<'a>(&'a self, query: &'a ProcessQuery) -> Vec<&'a Process> {
        let mut matching: Vec<&Process> = self
            .processes
            .values()
            .filter(|p| query.matches(p))
            .collect();
        matching.sort_by(|a, b| {
            a.submission_time
                .cmp(&b.submission_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        matching
    }

    fn remove_process_cascade(&mut self, id: &ProcessId) {
        self.processes.remove(id);
        self.attributes.retain(|_, a| &a.target_id != id);
    }

    fn remove_graph_cascade(&mut self, id: &ProcessGraphId) {
        if let Some(graph) = self.graphs.remove(id) {
            for process_id in &graph.process_ids {
                self.remove_process_cascade(process_id);
            }
        }
    }
}

fn not_found(kind: &'static str, id: impl ToString) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn already_exists(kind: &'static str, id: impl ToString) -> StoreError {
    StoreError::AlreadyExists {
        kind,
        id: id.to_string(),
    }
}

fn conflict(kind: &'static str, id: impl ToString) -> StoreError {
    StoreError::Conflict {
        kind,
        id: id.to_string(),
    }
}

/// Store backed by in-process hash maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `Unavailable` until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store marked unavailable".into()));
        }
        Ok(self.tables.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add_colony(&self, colony: Colony) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.colonies.contains_key(&colony.name) {
            return Err(already_exists("colony", &colony.name));
        }
        tables.colonies.insert(colony.name.clone(), colony);
        Ok(())
    }

    async fn get_colony(&self, name: &str) -> Result<Option<Colony>, StoreError> {
        Ok(self.tables()?.colonies.get(name).cloned())
    }

    async fn get_colonies(&self) -> Result<Vec<Colony>, StoreError> {
        let tables = self.tables()?;
        let mut colonies: Vec<Colony> = tables.colonies.values().cloned().collect();
        colonies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(colonies)
    }

    async fn remove_colony(&self, name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.colonies.remove(name).is_none() {
            return Err(not_found("colony", name));
        }
        tables.paused.remove(name);
        tables.executors.retain(|_, e| e.colony_name != name);
        tables.processes.retain(|_, p| p.colony_name != name);
        tables.graphs.retain(|_, g| g.colony_name != name);
        tables.attributes.retain(|_, a| a.colony_name != name);
        let generators: Vec<GeneratorId> = tables
            .generators
            .values()
            .filter(|g| g.colony_name == name)
            .map(|g| g.id.clone())
            .collect();
        for id in &generators {
            tables.generators.remove(id);
            tables.generator_args.remove(id);
        }
        tables.crons.retain(|_, c| c.colony_name != name);
        Ok(())
    }

    async fn set_assignments_paused(&self, colony_name: &str, paused: bool) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if !tables.colonies.contains_key(colony_name) {
            return Err(not_found("colony", colony_name));
        }
        if paused {
            tables.paused.insert(colony_name.to_string());
        } else {
            tables.paused.remove(colony_name);
        }
        Ok(())
    }

    async fn assignments_paused(&self, colony_name: &str) -> Result<bool, StoreError> {
        Ok(self.tables()?.paused.contains(colony_name))
    }

    async fn add_executor(&self, executor: Executor) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.executors.contains_key(&executor.id) {
            return Err(already_exists("executor", &executor.id));
        }
        let duplicate_name = tables
            .executors
            .values()
            .any(|e| e.colony_name == executor.colony_name && e.name == executor.name);
        if duplicate_name {
            return Err(already_exists("executor", &executor.name));
        }
        tables.executors.insert(executor.id.clone(), executor);
        Ok(())
    }

    async fn get_executor(&self, id: &ExecutorId) -> Result<Option<Executor>, StoreError> {
        Ok(self.tables()?.executors.get(id).cloned())
    }

    async fn get_executors(&self, colony_name: &str) -> Result<Vec<Executor>, StoreError> {
        let tables = self.tables()?;
        let mut executors: Vec<Executor> = tables
            .executors
            .values()
            .filter(|e| e.colony_name == colony_name)
            .cloned()
            .collect();
        executors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(executors)
    }

    async fn update_executor(&self, executor: Executor) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.executors.get_mut(&executor.id) {
            Some(slot) => {
                *slot = executor;
                Ok(())
            }
            None => Err(not_found("executor", &executor.id)),
        }
    }

    async fn remove_executor(&self, id: &ExecutorId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .executors
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("executor", id))
    }

    async fn add_process(&self, process: Process) -> Result<Process, StoreError> {
        let mut tables = self.tables()?;
        if tables.processes.contains_key(&process.id) {
            return Err(already_exists("process", &process.id));
        }
        tables.processes.insert(process.id.clone(), process.clone());
        Ok(process)
    }

    async fn get_process(&self, id: &ProcessId) -> Result<Option<Process>, StoreError> {
        Ok(self.tables()?.processes.get(id).cloned())
    }

    async fn find_processes(&self, query: &ProcessQuery) -> Result<Vec<Process>, StoreError> {
        let tables = self.tables()?;
        let matching = tables.sorted_processes(query);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matching.into_iter().take(limit).cloned().collect())
    }

    async fn find_candidates(
        &self,
        colony_name: &str,
        executor_type: &str,
        limit: usize,
    ) -> Result<Vec<Process>, StoreError> {
        let tables = self.tables()?;
        let query = ProcessQuery::colony(colony_name)
            .with_state(ProcessState::Waiting)
            .with_executor_type(executor_type);
        Ok(tables
            .sorted_processes(&query)
            .into_iter()
            .filter(|p| p.is_assignable())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn claim_process(&self, process: &Process) -> Result<Process, StoreError> {
        let mut tables = self.tables()?;
        let Some(stored) = tables.processes.get_mut(&process.id) else {
            return Err(not_found("process", &process.id));
        };
        let claimable = stored.is_assignable()
            && stored.assigned_executor_id.is_none()
            && stored.revision == process.revision;
        if !claimable {
            tracing::debug!(process_id = %process.id, "claim lost");
            return Err(conflict("process", &process.id));
        }
        *stored = Process {
            revision: stored.revision + 1,
            ..process.clone()
        };
        Ok(stored.clone())
    }

    async fn update_process(&self, process: &Process) -> Result<Process, StoreError> {
        let mut tables = self.tables()?;
        let Some(stored) = tables.processes.get_mut(&process.id) else {
            return Err(not_found("process", &process.id));
        };
        if stored.revision != process.revision {
            return Err(conflict("process", &process.id));
        }
        *stored = Process {
            revision: stored.revision + 1,
            ..process.clone()
        };
        Ok(stored.clone())
    }

    async fn remove_process(&self, id: &ProcessId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if !tables.processes.contains_key(id) {
            return Err(not_found("process", id));
        }
        tables.remove_process_cascade(id);
        Ok(())
    }

    async fn count_processes(
        &self,
        colony_name: &str,
        state: ProcessState,
    ) -> Result<usize, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .processes
            .values()
            .filter(|p| p.colony_name == colony_name && p.state == state)
            .count())
    }

    async fn add_process_graph(
        &self,
        graph: ProcessGraph,
        processes: Vec<Process>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.graphs.contains_key(&graph.id) {
            return Err(already_exists("process graph", &graph.id));
        }
        if let Some(existing) = processes.iter().find(|p| tables.processes.contains_key(&p.id)) {
            return Err(already_exists("process", &existing.id));
        }
        for process in processes {
            tables.processes.insert(process.id.clone(), process);
        }
        tables.graphs.insert(graph.id.clone(), graph);
        Ok(())
    }

    async fn get_process_graph(&self, id: &ProcessGraphId) -> Result<Option<ProcessGraph>, StoreError> {
        Ok(self.tables()?.graphs.get(id).cloned())
    }

    async fn get_process_graphs(
        &self,
        colony_name: &str,
        state: Option<ProcessState>,
    ) -> Result<Vec<ProcessGraph>, StoreError> {
        let tables = self.tables()?;
        let mut graphs: Vec<ProcessGraph> = tables
            .graphs
            .values()
            .filter(|g| g.colony_name == colony_name && state.is_none_or(|s| g.state == s))
            .cloned()
            .collect();
        graphs.sort_by(|a, b| {
            a.submission_time
                .cmp(&b.submission_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(graphs)
    }

    async fn update_process_graph(&self, graph: &ProcessGraph) -> Result<ProcessGraph, StoreError> {
        let mut tables = self.tables()?;
        let Some(stored) = tables.graphs.get_mut(&graph.id) else {
            return Err(not_found("process graph", &graph.id));
        };
        if stored.revision != graph.revision {
            return Err(conflict("process graph", &graph.id));
        }
        *stored = ProcessGraph {
            revision: stored.revision + 1,
            ..graph.clone()
        };
        Ok(stored.clone())
    }

    async fn remove_process_graph(&self, id: &ProcessGraphId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if !tables.graphs.contains_key(id) {
            return Err(not_found("process graph", id));
        }
        tables.remove_graph_cascade(id);
        Ok(())
    }

    async fn count_process_graphs(
        &self,
        colony_name: &str,
        state: ProcessState,
    ) -> Result<usize, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .graphs
            .values()
            .filter(|g| g.colony_name == colony_name && g.state == state)
            .count())
    }

    async fn add_attribute(&self, attribute: Attribute) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.attributes.contains_key(&attribute.id) {
            return Err(already_exists("attribute", &attribute.id));
        }
        tables.attributes.insert(attribute.id.clone(), attribute);
        Ok(())
    }

    async fn get_attribute(&self, id: &AttributeId) -> Result<Option<Attribute>, StoreError> {
        Ok(self.tables()?.attributes.get(id).cloned())
    }

    async fn get_attributes(&self, target_id: &ProcessId) -> Result<Vec<Attribute>, StoreError> {
        let tables = self.tables()?;
        let mut attributes: Vec<Attribute> = tables
            .attributes
            .values()
            .filter(|a| &a.target_id == target_id)
            .cloned()
            .collect();
        attributes.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.id.cmp(&b.id)));
        Ok(attributes)
    }

    async fn add_generator(&self, generator: Generator) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.generators.contains_key(&generator.id) {
            return Err(already_exists("generator", &generator.id));
        }
        tables.generators.insert(generator.id.clone(), generator);
        Ok(())
    }

    async fn get_generator(&self, id: &GeneratorId) -> Result<Option<Generator>, StoreError> {
        Ok(self.tables()?.generators.get(id).cloned())
    }

    async fn get_generators(&self, colony_name: &str) -> Result<Vec<Generator>, StoreError> {
        let tables = self.tables()?;
        let mut generators: Vec<Generator> = tables
            .generators
            .values()
            .filter(|g| g.colony_name == colony_name)
            .cloned()
            .collect();
        generators.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(generators)
    }

    async fn get_all_generators(&self) -> Result<Vec<Generator>, StoreError> {
        let tables = self.tables()?;
        let mut generators: Vec<Generator> = tables.generators.values().cloned().collect();
        generators.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(generators)
    }

    async fn update_generator(&self, generator: Generator) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.generators.get_mut(&generator.id) {
            Some(slot) => {
                *slot = generator;
                Ok(())
            }
            None => Err(not_found("generator", &generator.id)),
        }
    }

    async fn remove_generator(&self, id: &GeneratorId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.generators.remove(id).is_none() {
            return Err(not_found("generator", id));
        }
        tables.generator_args.remove(id);
        Ok(())
    }

    async fn add_generator_arg(
        &self,
        generator_id: &GeneratorId,
        arg: String,
        added: DateTime<Utc>,
    ) -> Result<GeneratorArg, StoreError> {
        let mut tables = self.tables()?;
        if !tables.generators.contains_key(generator_id) {
            return Err(not_found("generator", generator_id));
        }
        tables.next_arg_seq += 1;
        let entry = GeneratorArg {
            generator_id: generator_id.clone(),
            seq: tables.next_arg_seq,
            arg,
            added,
        };
        tables
            .generator_args
            .entry(generator_id.clone())
            .or_default()
            .insert(entry.seq, entry.clone());
        Ok(entry)
    }

    async fn get_generator_args(
        &self,
        generator_id: &GeneratorId,
        limit: Option<usize>,
    ) -> Result<Vec<GeneratorArg>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .generator_args
            .get(generator_id)
            .map(|args| {
                args.values()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_generator_args(&self, generator_id: &GeneratorId) -> Result<usize, StoreError> {
        let tables = self.tables()?;
        Ok(tables.generator_args.get(generator_id).map_or(0, BTreeMap::len))
    }

    async fn remove_generator_args(
        &self,
        generator_id: &GeneratorId,
        seqs: &[u64],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if let Some(args) = tables.generator_args.get_mut(generator_id) {
            for seq in seqs {
                args.remove(seq);
            }
        }
        Ok(())
    }

    async fn add_cron(&self, cron: Cron) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        if tables.crons.contains_key(&cron.id) {
            return Err(already_exists("cron", &cron.id));
        }
        tables.crons.insert(cron.id.clone(), cron);
        Ok(())
    }

    async fn get_cron(&self, id: &CronId) -> Result<Option<Cron>, StoreError> {
        Ok(self.tables()?.crons.get(id).cloned())
    }

    async fn get_crons(&self, colony_name: &str) -> Result<Vec<Cron>, StoreError> {
        let tables = self.tables()?;
        let mut crons: Vec<Cron> = tables
            .crons
            .values()
            .filter(|c| c.colony_name == colony_name)
            .cloned()
            .collect();
        crons.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(crons)
    }

    async fn get_all_crons(&self) -> Result<Vec<Cron>, StoreError> {
        let tables = self.tables()?;
        let mut crons: Vec<Cron> = tables.crons.values().cloned().collect();
        crons.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(crons)
    }

    async fn update_cron(&self, cron: Cron) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.crons.get_mut(&cron.id) {
            Some(slot) => {
                *slot = cron;
                Ok(())
            }
            None => Err(not_found("cron", &cron.id)),
        }
    }

    async fn remove_cron(&self, id: &CronId) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .crons
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("cron", id))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
