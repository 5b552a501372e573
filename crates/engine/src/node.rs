// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node flags shared by the command loop and the background loops

use std::sync::Mutex;

/// Identity and lifecycle flags of one server node
#[derive(Debug)]
pub struct NodeState {
    name: String,
    stopping: Mutex<bool>,
    leader: Mutex<bool>,
}

impl NodeState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stopping: Mutex::new(false),
            leader: Mutex::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Background loops stop submitting commands once this is set
    pub fn is_stopping(&self) -> bool {
        *self.stopping.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_stopping(&self) {
        *self.stopping.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    /// Leadership as of the last poll
    pub fn is_leader(&self) -> bool {
        *self.leader.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record leadership, returning the previous value
    pub fn set_leader(&self, leader: bool) -> bool {
        let mut current = self.leader.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, leader)
    }
}
