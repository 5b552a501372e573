// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storing transitions and carrying out their effects

use super::Runtime;
use crate::error::EngineError;
use colony_core::{
    Clock, Effect, Event, IdGen, Process, ProcessEvent, ProcessGraph, ProcessGraphId, ProcessId,
};
use colony_storage::{ProcessQuery, StoreError};
use std::collections::VecDeque;

const GRAPH_WRITE_ATTEMPTS: usize = 5;

impl<C: Clock, I: IdGen> Runtime<C, I> {
    /// Apply `event` and store the result without running follow-up effects
    ///
    /// Returns `None` when the event does not apply to the process.
    async fn apply(
        &self,
        process: &Process,
        event: ProcessEvent,
    ) -> Result<Option<(Process, Vec<Effect>)>, EngineError> {
        let (next, effects) = process.transition(event, &self.clock);
        if effects.is_empty() {
            return Ok(None);
        }
        let stored = self.store.update_process(&next).await?;
        self.bus.publish(&stored);
        Ok(Some((stored, effects)))
    }

    /// Apply `event`, store the result and run every effect it produces
    pub(super) async fn store_transition(
        &self,
        process: &Process,
        event: ProcessEvent,
    ) -> Result<Option<Process>, EngineError> {
        let Some((stored, effects)) = self.apply(process, event).await? else {
            return Ok(None);
        };
        self.execute_effects(effects).await?;
        Ok(Some(stored))
    }

    pub(super) async fn execute_effects(&self, effects: Vec<Effect>) -> Result<(), EngineError> {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Emit(event) => self.emit(&event),
                Effect::ReleaseChildren { process_id } => {
                    queue.extend(self.release_children(&process_id).await?);
                }
                Effect::ResolveGraph { graph_id } => {
                    queue.extend(self.resolve_graph(&graph_id).await?);
                }
            }
        }
        Ok(())
    }

    pub(super) fn emit(&self, event: &Event) {
        let fields = event.fields();
        match event {
            Event::ProcessSubmitted { .. }
            | Event::ProcessFailed { .. }
            | Event::GraphSubmitted { .. }
            | Event::GraphSucceeded { .. }
            | Event::GraphFailed { .. }
            | Event::GeneratorFired { .. }
            | Event::CronFired { .. } => {
                tracing::info!(event = event.name(), ?fields, "event");
            }
            _ => tracing::debug!(event = event.name(), ?fields, "event"),
        }
    }

    pub(super) async fn graph_members(
        &self,
        graph_id: &ProcessGraphId,
    ) -> Result<Vec<Process>, EngineError> {
        let query = ProcessQuery {
            process_graph_id: Some(graph_id.clone()),
            ..ProcessQuery::default()
        };
        Ok(self.store.find_processes(&query).await?)
    }

    /// Release the children of a closed process whose parents have all succeeded
    async fn release_children(&self, process_id: &ProcessId) -> Result<Vec<Effect>, EngineError> {
        let Some(closed) = self.store.get_process(process_id).await? else {
            return Ok(Vec::new());
        };
        let Some(graph_id) = closed.process_graph_id.clone() else {
            return Ok(Vec::new());
        };

        let members = self.graph_members(&graph_id).await?;
        let mut effects = Vec::new();
        for child in ProcessGraph::releasable_children(&closed, &members) {
            let input = ProcessGraph::collect_parent_output(child, &members);
            match self.apply(child, ProcessEvent::Release { input }).await {
                Ok(Some((_, more))) => effects.extend(more),
                Ok(None) => {}
                Err(EngineError::Conflict { .. }) => {
                    tracing::debug!(process_id = %child.id, "child changed while releasing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(effects)
    }

    /// Fail doomed members, then re-derive and store the graph state
    async fn resolve_graph(&self, graph_id: &ProcessGraphId) -> Result<Vec<Effect>, EngineError> {
        let Some(mut graph) = self.store.get_process_graph(graph_id).await? else {
            return Ok(Vec::new());
        };

        let mut members = self.graph_members(graph_id).await?;
        let doomed: Vec<(Process, ProcessId)> = ProcessGraph::doomed_descendants(&members)
            .into_iter()
            .map(|(process, cause)| (process.clone(), cause.clone()))
            .collect();

        let mut effects = Vec::new();
        if !doomed.is_empty() {
            for (process, cause) in &doomed {
                let reason = format!("dependency {} failed", cause);
                match self.apply(process, ProcessEvent::Fail { reason }).await {
                    // The graph is re-derived below
                    Ok(Some((_, more))) => effects.extend(
                        more.into_iter()
                            .filter(|e| !matches!(e, Effect::ResolveGraph { .. })),
                    ),
                    Ok(None) => {}
                    Err(EngineError::Conflict { .. }) => {
                        tracing::debug!(process_id = %process.id, "member changed while failing");
                    }
                    Err(e) => return Err(e),
                }
            }
            members = self.graph_members(graph_id).await?;
        }

        // Another node may store the graph between our read and write
        for _ in 0..GRAPH_WRITE_ATTEMPTS {
            let (resolved, event) = graph.resolve(&members, &self.clock);
            let Some(event) = event else {
                break;
            };
            match self.store.update_process_graph(&resolved).await {
                Ok(_) => {
                    effects.push(Effect::Emit(event));
                    break;
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(graph_id = %graph_id, "graph changed while resolving");
                    let Some(latest) = self.store.get_process_graph(graph_id).await? else {
                        break;
                    };
                    graph = latest;
                    members = self.graph_members(graph_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(effects)
    }
}
