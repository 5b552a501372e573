// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, status, shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use colony_adapters::{ProcessBus, StaticMembership, TracedMembership};
use colony_core::config::ConfigError;
use colony_core::{SystemClock, UuidIdGen};
use colony_engine::{Controller, EngineError, RuntimeDeps};
use colony_storage::MemoryStore;
use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Controller with the production clock and id generator
pub type DaemonController = Controller<SystemClock, UuidIdGen>;

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub controller: DaemonController,
    /// When daemon started
    pub start_time: Instant,
}

/// One periodic status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub uptime_secs: u64,
    pub leader: bool,
    pub colonies: usize,
    pub waiting: usize,
    pub running: usize,
}

impl DaemonState {
    /// Collect node status across every colony
    pub async fn status(&self) -> Result<Status, LifecycleError> {
        let mut status = Status {
            uptime_secs: self.start_time.elapsed().as_secs(),
            leader: self.controller.is_leader(),
            colonies: 0,
            waiting: 0,
            running: 0,
        };
        for colony in self.controller.get_colonies().await? {
            let stats = self.controller.colony_statistics(&colony.name).await?;
            status.colonies += 1;
            status.waiting += stats.waiting_processes;
            status.running += stats.running_processes;
        }
        Ok(status)
    }

    pub async fn log_status(&self) {
        match self.status().await {
            Ok(status) => info!(
                node = self.controller.node_name(),
                uptime_secs = status.uptime_secs,
                leader = status.leader,
                colonies = status.colonies,
                waiting = status.waiting,
                running = status.running,
                "status"
            ),
            Err(e) => warn!(error = %e, "failed to collect status"),
        }
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.controller.shutdown().await;

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // Lock is released when self.lock_file is dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read config {0}: {1}")]
    ConfigRead(PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire the lock FIRST; a running daemon keeps its pid file
    let lock_file = acquire_lock(config)?;

    match startup_inner(config, lock_file).await {
        Ok(state) => Ok(state),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    Ok(lock_file)
}

async fn startup_inner(config: &Config, mut lock_file: File) -> Result<DaemonState, LifecycleError> {
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let server = config.server.clone();
    let membership = TracedMembership::new(StaticMembership::from_config(&server));
    let deps = RuntimeDeps {
        store: Arc::new(MemoryStore::new()),
        membership: Arc::new(membership),
        bus: Arc::new(ProcessBus::new()),
    };

    info!(
        node = %server.node.name,
        mode = ?server.assignment.mode,
        planner = ?server.assignment.planner,
        roster = server.roster().len(),
        "starting node"
    );
    let controller = Controller::start(deps, server, SystemClock, UuidIdGen).await;

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        controller,
        start_time: Instant::now(),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
