// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crons: submit a workflow on a schedule

use super::Runtime;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use colony_core::{
    instantiate, Clock, Cron, CronDecision, CronId, Event, IdGen, ProcessGraph, SequentialIdGen,
};

impl<C: Clock, I: IdGen> Runtime<C, I> {
    /// Store a new cron under a fresh id; its first run is computed by the
    /// trigger loop
    pub async fn add_cron(&self, cron: Cron) -> Result<Cron, EngineError> {
        cron.validate()?;
        instantiate(&cron.workflow, &SequentialIdGen::new("check"), &self.clock)?;
        self.require_colony(&cron.colony_name).await?;

        let cron = Cron {
            id: CronId::new(self.ids.next()),
            next_run: None,
            last_run: None,
            prev_process_graph_id: None,
            ..cron
        };
        self.store.add_cron(cron.clone()).await?;
        tracing::info!(cron_id = %cron.id, name = %cron.name, "cron added");
        Ok(cron)
    }

    /// Submit the cron's workflow now, outside its schedule
    pub async fn run_cron(&self, id: &CronId) -> Result<ProcessGraph, EngineError> {
        let cron = self.get_cron(id).await?;
        let now = self.clock.now();
        let graph = self.submit_workflow(cron.workflow.clone()).await?;
        self.store
            .update_cron(cron.fired(graph.id.clone(), now, cron.next_run))
            .await?;
        self.emit(&Event::CronFired {
            id: cron.id,
            graph_id: graph.id.clone(),
        });
        Ok(graph)
    }

    pub async fn get_cron(&self, id: &CronId) -> Result<Cron, EngineError> {
        self.store
            .get_cron(id)
            .await?
            .ok_or_else(|| EngineError::not_found("cron", id))
    }

    pub async fn get_crons(&self, colony_name: &str) -> Result<Vec<Cron>, EngineError> {
        self.require_colony(colony_name).await?;
        Ok(self.store.get_crons(colony_name).await?)
    }

    pub async fn remove_cron(&self, id: &CronId) -> Result<(), EngineError> {
        self.store.remove_cron(id).await?;
        tracing::info!(cron_id = %id, "cron removed");
        Ok(())
    }

    /// Schedule or fire every cron; returns the number of workflows submitted
    pub async fn trigger_crons(&self) -> Result<usize, EngineError> {
        let mut fired = 0;
        for cron in self.store.get_all_crons().await? {
            let id = cron.id.clone();
            match self.trigger_cron(cron).await {
                Ok(true) => fired += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(cron_id = %id, error = %e, "cron trigger failed"),
            }
        }
        Ok(fired)
    }

    async fn trigger_cron(&self, cron: Cron) -> Result<bool, EngineError> {
        let now = self.clock.now();
        let prev_running = match &cron.prev_process_graph_id {
            Some(graph_id) if cron.wait_for_prev_process_graph => self
                .store
                .get_process_graph(graph_id)
                .await?
                .is_some_and(|graph| !graph.is_terminal()),
            _ => false,
        };

        match cron.decide(now, prev_running) {
            CronDecision::ScheduleFirst => {
                let next_run = self.next_run(&cron, now)?;
                self.store.update_cron(cron.scheduled(next_run)).await?;
                tracing::debug!(cron_id = %cron.id, ?next_run, "cron scheduled");
                Ok(false)
            }
            CronDecision::NotDue => Ok(false),
            CronDecision::Withhold => {
                if let Some(prev_graph_id) = cron.prev_process_graph_id.clone() {
                    self.emit(&Event::CronWithheld {
                        id: cron.id.clone(),
                        prev_graph_id,
                    });
                }
                Ok(false)
            }
            CronDecision::Fire => {
                let graph = self.submit_workflow(cron.workflow.clone()).await?;
                let next_run = self.next_run(&cron, now)?;
                self.store
                    .update_cron(cron.fired(graph.id.clone(), now, next_run))
                    .await?;
                self.emit(&Event::CronFired {
                    id: cron.id.clone(),
                    graph_id: graph.id,
                });
                Ok(true)
            }
        }
    }

    fn next_run(&self, cron: &Cron, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, EngineError> {
        let schedule = cron.schedule()?;
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Ok(schedule.next_after(after, &mut *rng))
    }
}

#[cfg(test)]
#[path = "crons_tests.rs"]
mod tests;
