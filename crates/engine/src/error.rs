// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use colony_adapters::MembershipError;
use colony_core::ValidationError;
use colony_storage::StoreError;
use thiserror::Error;

/// Errors returned by engine operations
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
    #[error("no waiting process available")]
    NoWorkAvailable,
    #[error("assignments are paused for colony {0}")]
    Paused(String),
    /// Lost a race against a concurrent writer; the caller may retry
    #[error("concurrent update to {kind} {id}")]
    Conflict { kind: &'static str, id: String },
    #[error("not the cluster leader (leader: {})", leader.as_deref().unwrap_or("none"))]
    NotLeader { leader: Option<String> },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("membership error: {0}")]
    Membership(#[from] MembershipError),
    #[error("engine stopped")]
    Stopped,
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Outcomes that are part of normal operation and must not be logged as errors
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            EngineError::NoWorkAvailable
                | EngineError::Paused(_)
                | EngineError::Conflict { .. }
                | EngineError::NotLeader { .. }
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => EngineError::NotFound { kind, id },
            StoreError::AlreadyExists { kind, id } => EngineError::AlreadyExists { kind, id },
            StoreError::Conflict { kind, id } => EngineError::Conflict { kind, id },
            other => EngineError::Store(other),
        }
    }
}
