// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generators: batch packed arguments into workflow submissions
//!
//! A generator fires one workflow per `trigger` packed args. When fewer
//! than `trigger` args are pending and the generator has been idle for
//! `timeout` seconds, a partial batch fires with whatever is pending.

use crate::clock::add_secs;
use crate::error::ValidationError;
use crate::id::GeneratorId;
use crate::spec::WorkflowSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub id: GeneratorId,
    pub colony_name: String,
    pub name: String,
    pub workflow: WorkflowSpec,
    /// Args per submitted workflow
    pub trigger: u32,
    /// Idle seconds before a partial batch fires (0 or -1 disables)
    pub timeout: i64,
    pub last_run: Option<DateTime<Utc>>,
    /// Time of the first pack since the last run
    pub first_pack: Option<DateTime<Utc>>,
}

/// One packed argument, ordered by a store-assigned sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorArg {
    pub generator_id: GeneratorId,
    pub seq: u64,
    pub arg: String,
    pub added: DateTime<Utc>,
}

impl Generator {
    pub fn new(
        id: impl Into<GeneratorId>,
        name: impl Into<String>,
        workflow: WorkflowSpec,
        trigger: u32,
        timeout: i64,
    ) -> Self {
        Self {
            id: id.into(),
            colony_name: workflow.colony_name.clone(),
            name: name.into(),
            workflow,
            trigger,
            timeout,
            last_run: None,
            first_pack: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.trigger == 0 {
            return Err(ValidationError::InvalidValue {
                field: "trigger",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.timeout < -1 {
            return Err(ValidationError::InvalidValue {
                field: "timeout",
                reason: format!("{} is below -1", self.timeout),
            });
        }
        if self.workflow.function_specs.is_empty() {
            return Err(ValidationError::EmptyWorkflow);
        }
        Ok(())
    }

    /// Record a pack, stamping `first_pack` if this is the first since the last run
    pub fn packed(&self, now: DateTime<Utc>) -> Self {
        Self {
            first_pack: self.first_pack.or(Some(now)),
            ..self.clone()
        }
    }

    /// Sizes of the batches that should fire now, given `pending` args
    pub fn plan(&self, pending: usize, now: DateTime<Utc>) -> Vec<usize> {
        let trigger = self.trigger as usize;
        if trigger == 0 || pending == 0 {
            return Vec::new();
        }

        let full = pending / trigger;
        if full > 0 {
            return vec![trigger; full];
        }

        if self.timeout > 0 {
            if let Some(since) = self.first_pack.or(self.last_run) {
                if now >= add_secs(since, self.timeout) {
                    return vec![pending];
                }
            }
        }
        Vec::new()
    }

    /// State after firing; `remaining` is the number of args still pending
    pub fn fired(&self, now: DateTime<Utc>, remaining: usize) -> Self {
        Self {
            last_run: Some(now),
            first_pack: (remaining > 0).then_some(now),
            ..self.clone()
        }
    }

    /// Workflow to submit for one batch
    pub fn workflow_for(&self, batch: &[GeneratorArg]) -> WorkflowSpec {
        let args: Vec<String> = batch.iter().map(|a| a.arg.clone()).collect();
        self.workflow.clone().with_root_args(&args)
    }
}

#[cfg(test)]
#[path = "generator_tests.rs"]
mod tests;
