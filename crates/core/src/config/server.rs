// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration
//!
//! Loaded from TOML. Every field has a default so an empty file is a valid
//! single-node configuration. Durations use humantime strings ("1s", "7d").

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Identity of this node in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "node-1".to_string(),
            host: "localhost".to_string(),
            port: 50080,
        }
    }
}

/// Static cluster roster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub nodes: Vec<NodeConfig>,
    /// Leader name when membership is static; the local node if unset
    pub leader: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMode {
    /// Only the leader assigns work
    #[default]
    Exclusive,
    /// Every node assigns, adjudicated by the store's conditional claim
    Distributed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerKind {
    #[default]
    Priority,
    Fifo,
    Deadline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub mode: AssignmentMode,
    pub planner: PlannerKind,
    /// Waiting processes fetched per claim attempt
    pub candidates: usize,
    /// Claim attempts before reporting no work (distributed mode)
    pub max_claim_attempts: usize,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            mode: AssignmentMode::default(),
            planner: PlannerKind::default(),
            candidates: 10,
            max_claim_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
    /// Seed for random intervals (entropy when unset)
    pub seed: Option<u64>,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(1),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderConfig {
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
            interval: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub node: NodeConfig,
    pub cluster: ClusterConfig,
    pub assignment: AssignmentConfig,
    pub timeouts: TimeoutConfig,
    pub generators: GeneratorConfig,
    pub crons: CronConfig,
    pub leader: LeaderConfig,
    pub retention: RetentionConfig,
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.name.is_empty() {
            return Err(ConfigError::Invalid("node.name must not be empty".into()));
        }
        if self.assignment.candidates == 0 {
            return Err(ConfigError::Invalid(
                "assignment.candidates must be at least 1".into(),
            ));
        }
        if self.assignment.max_claim_attempts == 0 {
            return Err(ConfigError::Invalid(
                "assignment.max_claim_attempts must be at least 1".into(),
            ));
        }
        for (name, interval) in [
            ("timeouts.sweep_interval", self.timeouts.sweep_interval),
            ("generators.check_interval", self.generators.check_interval),
            ("crons.check_interval", self.crons.check_interval),
            ("leader.poll_interval", self.leader.poll_interval),
            ("retention.interval", self.retention.interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }

    /// Roster including this node
    pub fn roster(&self) -> Vec<NodeConfig> {
        let mut nodes = self.cluster.nodes.clone();
        if !nodes.iter().any(|n| n.name == self.node.name) {
            nodes.insert(0, self.node.clone());
        }
        nodes
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
