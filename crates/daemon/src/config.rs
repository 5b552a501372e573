// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: the server config plus where the daemon keeps its files

use std::path::{Path, PathBuf};
use std::time::Duration;

use colony_core::ServerConfig;
use serde::Deserialize;

use crate::lifecycle::LifecycleError;

/// The `[daemon]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    /// Directory for the pid and log files
    pub state_dir: Option<PathBuf>,
    /// Log file; `<state_dir>/<node>.log` when unset
    pub log_file: Option<PathBuf>,
    /// How often the main loop logs a status line
    #[serde(with = "humantime_serde")]
    pub status_interval: Duration,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            state_dir: None,
            log_file: None,
            status_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    daemon: DaemonSection,
}

/// Resolved daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub status_interval: Duration,
}

impl Config {
    /// Load from a TOML file, or use defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self, LifecycleError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| LifecycleError::ConfigRead(path.to_path_buf(), e))?;
                Self::from_toml_str(&content)
            }
            None => Self::from_toml_str(""),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LifecycleError> {
        let server = ServerConfig::from_toml_str(content)?;
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| LifecycleError::Config(e.into()))?;
        Self::resolve(server, file.daemon)
    }

    fn resolve(server: ServerConfig, daemon: DaemonSection) -> Result<Self, LifecycleError> {
        if daemon.status_interval.is_zero() {
            return Err(LifecycleError::Config(
                colony_core::config::ConfigError::Invalid(
                    "daemon.status_interval must be non-zero".into(),
                ),
            ));
        }
        let state_dir = match daemon.state_dir {
            Some(dir) => dir,
            None => default_state_dir()?,
        };
        let node = server.node.name.clone();
        let log_path = daemon
            .log_file
            .unwrap_or_else(|| state_dir.join(format!("{}.log", node)));
        Ok(Self {
            lock_path: state_dir.join(format!("{}.pid", node)),
            log_path,
            state_dir,
            server,
            status_interval: daemon.status_interval,
        })
    }
}

/// XDG state directory, falling back to ~/.local/state
fn default_state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("colony"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/colony"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
