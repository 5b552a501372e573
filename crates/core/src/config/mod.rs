// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration modules

mod server;

pub use server::{
    AssignmentConfig, AssignmentMode, ClusterConfig, ConfigError, CronConfig, GeneratorConfig,
    LeaderConfig, NodeConfig, PlannerKind, RetentionConfig, ServerConfig, TimeoutConfig,
};
