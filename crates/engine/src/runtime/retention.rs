// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention: delete finished work older than the configured age

use super::Runtime;
use crate::error::EngineError;
use colony_core::{Clock, IdGen};
use colony_storage::ProcessQuery;

/// What one retention sweep deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub graphs: usize,
    pub processes: usize,
}

impl<C: Clock, I: IdGen> Runtime<C, I> {
    /// Remove terminal graphs and standalone processes that ended before
    /// `now - retention.max_age`
    pub async fn sweep_retention(&self) -> Result<RetentionReport, EngineError> {
        let now = self.clock.now();
        let Some(cutoff) = chrono::Duration::from_std(self.config.retention.max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return Ok(RetentionReport::default());
        };

        let mut report = RetentionReport::default();
        for colony in self.store.get_colonies().await? {
            let graphs = self.store.get_process_graphs(&colony.name, None).await?;
            let expired = graphs
                .iter()
                .filter(|g| g.is_terminal() && g.end_time.is_some_and(|end| end < cutoff));
            for graph in expired {
                match self.store.remove_process_graph(&graph.id).await {
                    Ok(()) => report.graphs += 1,
                    Err(colony_storage::StoreError::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            let query = ProcessQuery {
                standalone: true,
                ended_before: Some(cutoff),
                ..ProcessQuery::colony(&colony.name)
            };
            for process in self.store.find_processes(&query).await? {
                match self.store.remove_process(&process.id).await {
                    Ok(()) => report.processes += 1,
                    Err(colony_storage::StoreError::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if report != RetentionReport::default() {
            tracing::info!(
                graphs = report.graphs,
                processes = report.processes,
                "retention sweep"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
