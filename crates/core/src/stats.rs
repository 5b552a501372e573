// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-colony counters

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyStatistics {
    pub executors: usize,
    pub waiting_processes: usize,
    pub running_processes: usize,
    pub successful_processes: usize,
    pub failed_processes: usize,
    pub waiting_workflows: usize,
    pub running_workflows: usize,
    pub successful_workflows: usize,
    pub failed_workflows: usize,
}
