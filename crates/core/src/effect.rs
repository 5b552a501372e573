// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use crate::id::{CronId, ExecutorId, GeneratorId, ProcessGraphId, ProcessId};
use serde::{Deserialize, Serialize};

/// Effects are follow-up work that state machines request from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit an event for observers
    Emit(Event),
    /// Check whether children of a closed process can be released
    ReleaseChildren { process_id: ProcessId },
    /// Re-derive the aggregate state of a process graph
    ResolveGraph { graph_id: ProcessGraphId },
}

/// Events emitted by state machines and trigger engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ProcessSubmitted {
        id: ProcessId,
        colony: String,
    },
    ProcessReleased {
        id: ProcessId,
    },
    ProcessAssigned {
        id: ProcessId,
        executor_id: ExecutorId,
    },
    ProcessUnassigned {
        id: ProcessId,
        retries: u32,
    },
    ProcessSucceeded {
        id: ProcessId,
    },
    ProcessFailed {
        id: ProcessId,
        reason: String,
    },

    GraphSubmitted {
        id: ProcessGraphId,
        colony: String,
    },
    GraphRunning {
        id: ProcessGraphId,
    },
    GraphSucceeded {
        id: ProcessGraphId,
    },
    GraphFailed {
        id: ProcessGraphId,
    },

    GeneratorFired {
        id: GeneratorId,
        graph_id: ProcessGraphId,
        args: usize,
    },
    CronFired {
        id: CronId,
        graph_id: ProcessGraphId,
    },
    CronWithheld {
        id: CronId,
        prev_graph_id: ProcessGraphId,
    },
}

impl Event {
    /// Event name used for log spans and subscriptions
    pub fn name(&self) -> &'static str {
        match self {
            Event::ProcessSubmitted { .. } => "process:submitted",
            Event::ProcessReleased { .. } => "process:released",
            Event::ProcessAssigned { .. } => "process:assigned",
            Event::ProcessUnassigned { .. } => "process:unassigned",
            Event::ProcessSucceeded { .. } => "process:succeeded",
            Event::ProcessFailed { .. } => "process:failed",

            Event::GraphSubmitted { .. } => "graph:submitted",
            Event::GraphRunning { .. } => "graph:running",
            Event::GraphSucceeded { .. } => "graph:succeeded",
            Event::GraphFailed { .. } => "graph:failed",

            Event::GeneratorFired { .. } => "generator:fired",
            Event::CronFired { .. } => "cron:fired",
            Event::CronWithheld { .. } => "cron:withheld",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Event::ProcessSubmitted { id, colony } => {
                vec![("process_id", id.to_string()), ("colony", colony.clone())]
            }
            Event::ProcessReleased { id } | Event::ProcessSucceeded { id } => {
                vec![("process_id", id.to_string())]
            }
            Event::ProcessAssigned { id, executor_id } => vec![
                ("process_id", id.to_string()),
                ("executor_id", executor_id.to_string()),
            ],
            Event::ProcessUnassigned { id, retries } => vec![
                ("process_id", id.to_string()),
                ("retries", retries.to_string()),
            ],
            Event::ProcessFailed { id, reason } => {
                vec![("process_id", id.to_string()), ("reason", reason.clone())]
            }
            Event::GraphSubmitted { id, colony } => {
                vec![("graph_id", id.to_string()), ("colony", colony.clone())]
            }
            Event::GraphRunning { id } | Event::GraphSucceeded { id } | Event::GraphFailed { id } => {
                vec![("graph_id", id.to_string())]
            }
            Event::GeneratorFired { id, graph_id, args } => vec![
                ("generator_id", id.to_string()),
                ("graph_id", graph_id.to_string()),
                ("args", args.to_string()),
            ],
            Event::CronFired { id, graph_id } => vec![
                ("cron_id", id.to_string()),
                ("graph_id", graph_id.to_string()),
            ],
            Event::CronWithheld { id, prev_graph_id } => vec![
                ("cron_id", id.to_string()),
                ("prev_graph_id", prev_graph_id.to_string()),
            ],
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
