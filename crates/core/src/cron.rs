// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crons: submit a workflow on a schedule
//!
//! A cron runs on either a cron expression (six fields, seconds first), a
//! fixed interval, or a random interval drawn uniformly from
//! `[0, interval)` seconds.

use crate::clock::add_secs;
use crate::error::ValidationError;
use crate::id::{CronId, ProcessGraphId};
use crate::spec::WorkflowSpec;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A parsed schedule
#[derive(Debug, Clone)]
pub enum CronSchedule {
    Expression(Box<::cron::Schedule>),
    Interval(i64),
    Random(i64),
}

impl CronSchedule {
    /// First run strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>, rng: &mut impl Rng) -> Option<DateTime<Utc>> {
        match self {
            CronSchedule::Expression(schedule) => schedule.after(&after).next(),
            CronSchedule::Interval(secs) => Some(add_secs(after, *secs)),
            CronSchedule::Random(secs) => Some(add_secs(after, rng.gen_range(0..*secs))),
        }
    }
}

/// What the trigger loop should do with a cron on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronDecision {
    /// Never scheduled: compute `next_run` without submitting
    ScheduleFirst,
    NotDue,
    /// Due, but the previous graph is still running
    Withhold,
    Fire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cron {
    pub id: CronId,
    pub colony_name: String,
    pub name: String,
    /// Cron expression; empty when an interval is used
    #[serde(default)]
    pub expression: String,
    /// Interval in seconds (-1 when an expression is used)
    pub interval: i64,
    /// Draw each wait uniformly from `[0, interval)`
    #[serde(default)]
    pub random: bool,
    pub workflow: WorkflowSpec,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub prev_process_graph_id: Option<ProcessGraphId>,
    #[serde(default)]
    pub wait_for_prev_process_graph: bool,
}

impl Cron {
    pub fn with_expression(
        id: impl Into<CronId>,
        name: impl Into<String>,
        expression: impl Into<String>,
        workflow: WorkflowSpec,
    ) -> Self {
        Self {
            id: id.into(),
            colony_name: workflow.colony_name.clone(),
            name: name.into(),
            expression: expression.into(),
            interval: -1,
            random: false,
            workflow,
            next_run: None,
            last_run: None,
            prev_process_graph_id: None,
            wait_for_prev_process_graph: false,
        }
    }

    pub fn with_interval(
        id: impl Into<CronId>,
        name: impl Into<String>,
        interval: i64,
        random: bool,
        workflow: WorkflowSpec,
    ) -> Self {
        Self {
            expression: String::new(),
            interval,
            random,
            ..Self::with_expression(id, name, "", workflow)
        }
    }

    pub fn waiting_for_previous(mut self, wait: bool) -> Self {
        self.wait_for_prev_process_graph = wait;
        self
    }

    /// Parse the schedule; exactly one of expression or positive interval
    pub fn schedule(&self) -> Result<CronSchedule, ValidationError> {
        let has_expression = !self.expression.trim().is_empty();
        let has_interval = self.interval > 0;
        match (has_expression, has_interval) {
            (true, false) => ::cron::Schedule::from_str(&self.expression)
                .map(|s| CronSchedule::Expression(Box::new(s)))
                .map_err(|e| ValidationError::InvalidCronExpression {
                    expression: self.expression.clone(),
                    reason: e.to_string(),
                }),
            (false, true) if self.random => Ok(CronSchedule::Random(self.interval)),
            (false, true) => Ok(CronSchedule::Interval(self.interval)),
            (true, true) => Err(ValidationError::InvalidValue {
                field: "interval",
                reason: "cron expression and interval are mutually exclusive".to_string(),
            }),
            (false, false) => Err(ValidationError::MissingField("expression or interval")),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.workflow.function_specs.is_empty() {
            return Err(ValidationError::EmptyWorkflow);
        }
        self.schedule().map(|_| ())
    }

    /// Decide this tick's action; `prev_running` is whether the previous
    /// graph exists and has not reached a terminal state
    pub fn decide(&self, now: DateTime<Utc>, prev_running: bool) -> CronDecision {
        match self.next_run {
            None => CronDecision::ScheduleFirst,
            Some(next) if now < next => CronDecision::NotDue,
            Some(_) if self.wait_for_prev_process_graph && prev_running => CronDecision::Withhold,
            Some(_) => CronDecision::Fire,
        }
    }

    pub fn scheduled(&self, next_run: Option<DateTime<Utc>>) -> Self {
        Self {
            next_run,
            ..self.clone()
        }
    }

    /// State after submitting `graph_id`
    pub fn fired(
        &self,
        graph_id: ProcessGraphId,
        now: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            last_run: Some(now),
            prev_process_graph_id: Some(graph_id),
            next_run,
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
