// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key/value attributes attached to processes

use crate::id::{AttributeId, ProcessGraphId, ProcessId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    In,
    Out,
    Err,
    Env,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::In => write!(f, "in"),
            AttributeType::Out => write!(f, "out"),
            AttributeType::Err => write!(f, "err"),
            AttributeType::Env => write!(f, "env"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub target_id: ProcessId,
    pub colony_name: String,
    pub process_graph_id: Option<ProcessGraphId>,
    pub attribute_type: AttributeType,
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(
        target_id: impl Into<ProcessId>,
        attribute_type: AttributeType,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: AttributeId::new(""),
            target_id: target_id.into(),
            colony_name: String::new(),
            process_graph_id: None,
            attribute_type,
            key: key.into(),
            value: value.into(),
        }
    }
}
