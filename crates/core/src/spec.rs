// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative work descriptions
//!
//! A `FunctionSpec` describes one unit of work; a `WorkflowSpec` is a set of
//! function specs linked by named dependencies. Both are immutable once
//! submitted.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Constraints deciding which executors may run a process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub colony_name: String,
    pub executor_type: String,
    /// Restrict to these executor names (empty means any)
    #[serde(default)]
    pub executor_names: Vec<String>,
    /// Node names of the workflow this spec depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub min_cpu_millis: Option<u64>,
    #[serde(default)]
    pub min_memory_mib: Option<u64>,
}

/// Description of one unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Name of this spec inside a workflow
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub func_name: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default)]
    pub kwargs: HashMap<String, serde_json::Value>,
    /// Higher values are assigned first
    #[serde(default)]
    pub priority: i32,
    /// Seconds a process may wait for assignment (0 or -1 disables)
    #[serde(default)]
    pub max_wait_time: i64,
    /// Seconds a process may run once assigned (0 or -1 disables)
    #[serde(default)]
    pub max_exec_time: i64,
    /// Retry budget on timeout (-1 is unlimited)
    #[serde(default)]
    pub max_retries: i32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub conditions: Conditions,
}

impl FunctionSpec {
    /// Create a spec targeting an executor type in a colony
    pub fn new(colony_name: impl Into<String>, executor_type: impl Into<String>) -> Self {
        Self {
            node_name: String::new(),
            func_name: String::new(),
            args: Vec::new(),
            kwargs: HashMap::new(),
            priority: 0,
            max_wait_time: -1,
            max_exec_time: -1,
            max_retries: 0,
            label: String::new(),
            env: HashMap::new(),
            conditions: Conditions {
                colony_name: colony_name.into(),
                executor_type: executor_type.into(),
                ..Conditions::default()
            },
        }
    }

    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = name.into();
        self
    }

    pub fn with_func_name(mut self, name: impl Into<String>) -> Self {
        self.func_name = name.into();
        self
    }

    pub fn with_args(mut self, args: Vec<serde_json::Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_exec_time(mut self, secs: i64) -> Self {
        self.max_exec_time = secs;
        self
    }

    pub fn with_max_wait_time(mut self, secs: i64) -> Self {
        self.max_wait_time = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: i32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_dependencies(mut self, deps: Vec<&str>) -> Self {
        self.conditions.dependencies = deps.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_executor_names(mut self, names: Vec<&str>) -> Self {
        self.conditions.executor_names = names.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_resources(mut self, cpu_millis: Option<u64>, memory_mib: Option<u64>) -> Self {
        self.conditions.min_cpu_millis = cpu_millis;
        self.conditions.min_memory_mib = memory_mib;
        self
    }

    /// Exec deadline is enforced only for positive limits
    pub fn exec_time_limited(&self) -> bool {
        self.max_exec_time > 0
    }

    /// Wait deadline is enforced only for positive limits
    pub fn wait_time_limited(&self) -> bool {
        self.max_wait_time > 0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.conditions.colony_name.is_empty() {
            return Err(ValidationError::MissingField("conditions.colony_name"));
        }
        if self.conditions.executor_type.is_empty() {
            return Err(ValidationError::MissingField("conditions.executor_type"));
        }
        for (field, value) in [
            ("max_wait_time", self.max_wait_time),
            ("max_exec_time", self.max_exec_time),
            ("max_retries", i64::from(self.max_retries)),
        ] {
            if value < -1 {
                return Err(ValidationError::InvalidValue {
                    field,
                    reason: format!("{} is below -1", value),
                });
            }
        }
        Ok(())
    }
}

/// A DAG of function specs submitted as one unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub colony_name: String,
    pub function_specs: Vec<FunctionSpec>,
}

impl WorkflowSpec {
    pub fn new(colony_name: impl Into<String>) -> Self {
        Self {
            colony_name: colony_name.into(),
            function_specs: Vec::new(),
        }
    }

    pub fn with_spec(mut self, spec: FunctionSpec) -> Self {
        self.function_specs.push(spec);
        self
    }

    /// Indices of specs without dependencies
    pub fn root_indices(&self) -> Vec<usize> {
        self.function_specs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.conditions.dependencies.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Append arguments to every root spec (used by generators)
    pub fn with_root_args(mut self, args: &[String]) -> Self {
        for index in self.root_indices() {
            if let Some(spec) = self.function_specs.get_mut(index) {
                spec.args
                    .extend(args.iter().cloned().map(serde_json::Value::String));
            }
        }
        self
    }
}
