// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow submission and process graph operations

use super::Runtime;
use crate::error::EngineError;
use colony_core::{
    instantiate, Clock, Event, IdGen, InstantiatedWorkflow, ProcessGraph, ProcessGraphId,
    ProcessState, WorkflowSpec,
};

impl<C: Clock, I: IdGen> Runtime<C, I> {
    /// Validate a workflow and store its graph with every member process
    pub async fn submit_workflow(&self, workflow: WorkflowSpec) -> Result<ProcessGraph, EngineError> {
        let InstantiatedWorkflow { graph, processes } =
            instantiate(&workflow, &self.ids, &self.clock)?;
        self.require_colony(&graph.colony_name).await?;

        self.store
            .add_process_graph(graph.clone(), processes.clone())
            .await?;
        for process in &processes {
            self.bus.publish(process);
        }
        self.emit(&Event::GraphSubmitted {
            id: graph.id.clone(),
            colony: graph.colony_name.clone(),
        });
        Ok(graph)
    }

    pub async fn get_process_graph(&self, id: &ProcessGraphId) -> Result<ProcessGraph, EngineError> {
        self.store
            .get_process_graph(id)
            .await?
            .ok_or_else(|| EngineError::not_found("process graph", id))
    }

    pub async fn get_process_graphs(
        &self,
        colony_name: &str,
        state: Option<ProcessState>,
    ) -> Result<Vec<ProcessGraph>, EngineError> {
        self.require_colony(colony_name).await?;
        Ok(self.store.get_process_graphs(colony_name, state).await?)
    }

    /// Remove a graph together with its member processes
    pub async fn remove_process_graph(&self, id: &ProcessGraphId) -> Result<(), EngineError> {
        self.store.remove_process_graph(id).await?;
        tracing::info!(graph_id = %id, "process graph removed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
