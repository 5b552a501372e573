// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Colony and executor operations

use super::Runtime;
use crate::error::EngineError;
use colony_core::{
    Clock, Colony, Executor, ExecutorId, IdGen, ProcessEvent, ProcessState, RetryDecision,
    ValidationError,
};
use colony_storage::ProcessQuery;

impl<C: Clock, I: IdGen> Runtime<C, I> {
    pub async fn add_colony(&self, colony: Colony) -> Result<Colony, EngineError> {
        if colony.name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        let colony = if colony.id.is_empty() {
            Colony {
                id: self.ids.next(),
                ..colony
            }
        } else {
            colony
        };
        self.store.add_colony(colony.clone()).await?;
        tracing::info!(colony = %colony.name, "colony added");
        Ok(colony)
    }

    /// Remove a colony and everything that belongs to it
    pub async fn remove_colony(&self, name: &str) -> Result<(), EngineError> {
        self.store.remove_colony(name).await?;
        tracing::info!(colony = name, "colony removed");
        Ok(())
    }

    pub async fn get_colony(&self, name: &str) -> Result<Colony, EngineError> {
        self.store
            .get_colony(name)
            .await?
            .ok_or_else(|| EngineError::not_found("colony", name))
    }

    pub async fn get_colonies(&self) -> Result<Vec<Colony>, EngineError> {
        Ok(self.store.get_colonies().await?)
    }

    /// Register an executor; it cannot be assigned work until approved
    pub async fn add_executor(
        &self,
        name: &str,
        executor_type: &str,
        colony_name: &str,
    ) -> Result<Executor, EngineError> {
        if name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if executor_type.is_empty() {
            return Err(ValidationError::MissingField("executor_type").into());
        }
        self.require_colony(colony_name).await?;

        let executor = Executor::new(
            self.ids.next(),
            name,
            executor_type,
            colony_name,
            &self.clock,
        );
        self.store.add_executor(executor.clone()).await?;
        tracing::info!(executor_id = %executor.id, name, colony = colony_name, "executor added");
        Ok(executor)
    }

    pub async fn approve_executor(&self, id: &ExecutorId) -> Result<Executor, EngineError> {
        let executor = self.get_executor(id).await?.approve();
        self.store.update_executor(executor.clone()).await?;
        tracing::info!(executor_id = %id, "executor approved");
        Ok(executor)
    }

    pub async fn reject_executor(&self, id: &ExecutorId) -> Result<Executor, EngineError> {
        let executor = self.get_executor(id).await?.reject();
        self.store.update_executor(executor.clone()).await?;
        tracing::info!(executor_id = %id, "executor rejected");
        Ok(executor)
    }

    pub async fn get_executor(&self, id: &ExecutorId) -> Result<Executor, EngineError> {
        self.store
            .get_executor(id)
            .await?
            .ok_or_else(|| EngineError::not_found("executor", id))
    }

    pub async fn get_executors(&self, colony_name: &str) -> Result<Vec<Executor>, EngineError> {
        self.require_colony(colony_name).await?;
        Ok(self.store.get_executors(colony_name).await?)
    }

    /// Remove an executor, returning its running processes to the pool
    pub async fn remove_executor(&self, id: &ExecutorId) -> Result<(), EngineError> {
        let executor = self.get_executor(id).await?;
        let running = self
            .store
            .find_processes(&ProcessQuery::colony(&executor.colony_name).with_state(ProcessState::Running))
            .await?;
        for process in running.iter().filter(|p| p.is_assigned_to(id)) {
            let event = match process.retry_decision() {
                RetryDecision::Retry => ProcessEvent::Unassign,
                RetryDecision::Exhausted => ProcessEvent::Fail {
                    reason: format!("executor {} removed and max retries exceeded", id),
                },
            };
            self.store_transition(process, event).await?;
        }
        self.store.remove_executor(id).await?;
        tracing::info!(executor_id = %id, "executor removed");
        Ok(())
    }
}
