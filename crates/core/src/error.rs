// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors for submitted specs

use thiserror::Error;

/// A malformed spec or a missing required field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("workflow has no function specs")]
    EmptyWorkflow,
    #[error("duplicate node name in workflow: {0}")]
    DuplicateNode(String),
    #[error("node {node} depends on unknown node {dependency}")]
    UnknownDependency { node: String, dependency: String },
    #[error("workflow dependencies contain a cycle")]
    Cycle,
    #[error("colony mismatch: expected {expected}, got {actual}")]
    ColonyMismatch { expected: String, actual: String },
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCronExpression { expression: String, reason: String },
}
