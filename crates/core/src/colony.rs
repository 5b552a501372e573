// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Colonies: the tenant boundary owning executors and processes

use serde::{Deserialize, Serialize};

/// A tenant namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colony {
    pub id: String,
    pub name: String,
    /// Public key of the colony owner
    pub owner_key: String,
}

impl Colony {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_key: owner_key.into(),
        }
    }
}
