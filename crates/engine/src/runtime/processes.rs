// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process operations: submit, assign, close, unassign, attributes

use super::Runtime;
use crate::assign::{ClaimRequest, ResourceHints};
use crate::error::EngineError;
use colony_core::{
    Attribute, AttributeId, Clock, ColonyStatistics, Event, Executor, ExecutorId, FunctionSpec,
    IdGen, Process, ProcessEvent, ProcessId, ProcessState, RetryDecision,
};
use colony_storage::ProcessQuery;

impl<C: Clock, I: IdGen> Runtime<C, I> {
    pub async fn submit_process(&self, spec: FunctionSpec) -> Result<Process, EngineError> {
        spec.validate()?;
        self.require_colony(&spec.conditions.colony_name).await?;

        let process = Process::new(self.ids.next(), spec, &self.clock);
        let stored = self.store.add_process(process).await?;
        self.bus.publish(&stored);
        self.emit(&Event::ProcessSubmitted {
            id: stored.id.clone(),
            colony: stored.colony_name.clone(),
        });
        Ok(stored)
    }

    /// Select and claim one waiting process for `executor_id`
    pub async fn assign(
        &self,
        executor_id: &ExecutorId,
        colony_name: &str,
        hints: ResourceHints,
    ) -> Result<Process, EngineError> {
        let executor = self.approved_executor(executor_id, colony_name).await?;
        if self.store.assignments_paused(colony_name).await? {
            return Err(EngineError::Paused(colony_name.to_string()));
        }

        let clock = &self.clock;
        let assign = |process: &Process| {
            process.transition(
                ProcessEvent::Assign {
                    executor_id: executor.id.clone(),
                },
                clock,
            )
        };
        let claimed = self
            .assigner
            .claim(ClaimRequest {
                executor: &executor,
                hints,
                batch: self.config.assignment.candidates,
                planner: self.planner.as_ref(),
                store: self.store.as_ref(),
                assign: &assign,
            })
            .await?;

        self.touch_executor(&executor).await;
        self.bus.publish(&claimed.process);
        self.execute_effects(claimed.effects).await?;
        Ok(claimed.process)
    }

    pub async fn close_successful(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
        output: Vec<serde_json::Value>,
    ) -> Result<Process, EngineError> {
        let process = self.running_process_for(process_id, executor_id).await?;
        self.touch_executor_id(executor_id).await;
        self.store_transition(&process, ProcessEvent::CloseSuccessful { output })
            .await?
            .ok_or_else(|| not_running(&process))
    }

    pub async fn close_failed(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
        errors: Vec<String>,
    ) -> Result<Process, EngineError> {
        let process = self.running_process_for(process_id, executor_id).await?;
        self.touch_executor_id(executor_id).await;
        self.store_transition(&process, ProcessEvent::CloseFailed { errors })
            .await?
            .ok_or_else(|| not_running(&process))
    }

    /// Hand a running process back to the pool, counting one retry
    ///
    /// Fails the process instead when its retry budget is used up.
    pub async fn unassign_process(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
    ) -> Result<Process, EngineError> {
        let process = self.running_process_for(process_id, executor_id).await?;
        let event = match process.retry_decision() {
            RetryDecision::Retry => ProcessEvent::Unassign,
            RetryDecision::Exhausted => ProcessEvent::Fail {
                reason: "max retries exceeded".to_string(),
            },
        };
        self.store_transition(&process, event)
            .await?
            .ok_or_else(|| not_running(&process))
    }

    pub async fn get_process(&self, id: &ProcessId) -> Result<Process, EngineError> {
        self.store
            .get_process(id)
            .await?
            .ok_or_else(|| EngineError::not_found("process", id))
    }

    pub async fn get_processes(
        &self,
        colony_name: &str,
        state: Option<ProcessState>,
        limit: Option<usize>,
    ) -> Result<Vec<Process>, EngineError> {
        self.require_colony(colony_name).await?;
        let query = ProcessQuery {
            state,
            limit,
            ..ProcessQuery::colony(colony_name)
        };
        Ok(self.store.find_processes(&query).await?)
    }

    /// Remove a standalone process; graph members go with their graph
    pub async fn remove_process(&self, id: &ProcessId) -> Result<(), EngineError> {
        let process = self.get_process(id).await?;
        if let Some(graph_id) = &process.process_graph_id {
            return Err(EngineError::InvalidState(format!(
                "process {} belongs to process graph {}",
                id, graph_id
            )));
        }
        Ok(self.store.remove_process(id).await?)
    }

    /// Attach an attribute to an existing process
    pub async fn add_attribute(&self, attribute: Attribute) -> Result<Attribute, EngineError> {
        if attribute.key.is_empty() {
            return Err(colony_core::ValidationError::MissingField("key").into());
        }
        let target = self.get_process(&attribute.target_id).await?;
        let attribute = Attribute {
            id: AttributeId::new(self.ids.next()),
            colony_name: target.colony_name,
            process_graph_id: target.process_graph_id,
            ..attribute
        };
        self.store.add_attribute(attribute.clone()).await?;
        Ok(attribute)
    }

    pub async fn get_attribute(&self, id: &AttributeId) -> Result<Attribute, EngineError> {
        self.store
            .get_attribute(id)
            .await?
            .ok_or_else(|| EngineError::not_found("attribute", id))
    }

    pub async fn get_attributes(&self, process_id: &ProcessId) -> Result<Vec<Attribute>, EngineError> {
        self.get_process(process_id).await?;
        Ok(self.store.get_attributes(process_id).await?)
    }

    pub async fn colony_statistics(&self, colony_name: &str) -> Result<ColonyStatistics, EngineError> {
        self.require_colony(colony_name).await?;
        let store = &self.store;
        Ok(ColonyStatistics {
            executors: store.get_executors(colony_name).await?.len(),
            waiting_processes: store.count_processes(colony_name, ProcessState::Waiting).await?,
            running_processes: store.count_processes(colony_name, ProcessState::Running).await?,
            successful_processes: store.count_processes(colony_name, ProcessState::Success).await?,
            failed_processes: store.count_processes(colony_name, ProcessState::Failed).await?,
            waiting_workflows: store.count_process_graphs(colony_name, ProcessState::Waiting).await?,
            running_workflows: store.count_process_graphs(colony_name, ProcessState::Running).await?,
            successful_workflows: store.count_process_graphs(colony_name, ProcessState::Success).await?,
            failed_workflows: store.count_process_graphs(colony_name, ProcessState::Failed).await?,
        })
    }

    pub async fn pause_assignments(&self, colony_name: &str) -> Result<(), EngineError> {
        self.store.set_assignments_paused(colony_name, true).await?;
        tracing::info!(colony = colony_name, "assignments paused");
        Ok(())
    }

    pub async fn resume_assignments(&self, colony_name: &str) -> Result<(), EngineError> {
        self.store.set_assignments_paused(colony_name, false).await?;
        tracing::info!(colony = colony_name, "assignments resumed");
        Ok(())
    }

    async fn approved_executor(
        &self,
        executor_id: &ExecutorId,
        colony_name: &str,
    ) -> Result<Executor, EngineError> {
        let executor = self
            .store
            .get_executor(executor_id)
            .await?
            .ok_or_else(|| EngineError::not_found("executor", executor_id))?;
        if executor.colony_name != colony_name {
            return Err(EngineError::Unauthorized(format!(
                "executor {} is not a member of colony {}",
                executor_id, colony_name
            )));
        }
        if !executor.is_approved() {
            return Err(EngineError::Unauthorized(format!(
                "executor {} is not approved",
                executor_id
            )));
        }
        Ok(executor)
    }

    async fn running_process_for(
        &self,
        process_id: &ProcessId,
        executor_id: &ExecutorId,
    ) -> Result<Process, EngineError> {
        let process = self.get_process(process_id).await?;
        if !process.is_running() {
            return Err(not_running(&process));
        }
        if !process.is_assigned_to(executor_id) {
            return Err(EngineError::Unauthorized(format!(
                "process {} is not assigned to executor {}",
                process_id, executor_id
            )));
        }
        Ok(process)
    }

    /// Refresh `last_heard_from`; a failure here never undoes the operation
    async fn touch_executor(&self, executor: &Executor) {
        if let Err(e) = self
            .store
            .update_executor(executor.heard_from(&self.clock))
            .await
        {
            tracing::warn!(executor_id = %executor.id, error = %e, "failed to refresh executor");
        }
    }

    async fn touch_executor_id(&self, executor_id: &ExecutorId) {
        match self.store.get_executor(executor_id).await {
            Ok(Some(executor)) => self.touch_executor(&executor).await,
            Ok(None) => {}
            Err(e) => tracing::warn!(%executor_id, error = %e, "failed to refresh executor"),
        }
    }
}

fn not_running(process: &Process) -> EngineError {
    EngineError::InvalidState(format!("process {} is {}", process.id, process.state))
}
