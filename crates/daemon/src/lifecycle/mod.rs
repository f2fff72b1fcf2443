// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mh_core::SystemClock;
use mh_engine::{SchedulerError, UnitError, UpdateError, DEFAULT_DELAY, DEFAULT_UPDATE_TIMEOUT};
use mh_storage::StoreError;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::env;
use crate::host::Host;

/// Name of the optional overlay file in the state directory
pub const HOST_FILE: &str = "host.toml";

/// Actor stamped on job definitions when `MH_ACTOR` is unset
pub const DEFAULT_ACTOR: &str = "daemon";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/mh)
    pub state_dir: PathBuf,
    /// Directory scanned for unit archives
    pub repository_dir: PathBuf,
    /// Explicit archive list; when non-empty the repository is not scanned
    pub unit_list: Vec<PathBuf>,
    /// Path to the persisted job definitions
    pub jobs_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Directory for daily-rolled daemon logs
    pub log_dir: PathBuf,
    pub host_version: String,
    pub schema_version: Option<String>,
    pub default_delay: Duration,
    pub update_timeout: Duration,
    /// Run the update sweep in the background at startup
    pub check_updates: bool,
    /// Allow install/uninstall of unit archives
    pub allow_admin: bool,
    pub actor: String,
}

/// Settings read from `host.toml`. Environment variables win.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HostFile {
    repository: Option<PathBuf>,
    unit_list: Vec<PathBuf>,
    schema_version: Option<String>,
    default_delay_ms: Option<u64>,
    update_timeout_ms: Option<u64>,
    check_updates: Option<bool>,
    allow_admin: Option<bool>,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/mh/` (or `$XDG_STATE_HOME/mh/`).
    pub fn load() -> Result<Self, LifecycleError> {
        Self::at(env::state_dir()?)
    }

    /// Build the configuration rooted at `state_dir`, overlaying `host.toml`
    /// when present and then the environment.
    pub fn at(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let file = read_host_file(&state_dir.join(HOST_FILE))?;
        let mut config = Self::defaults(state_dir);
        config.apply_file(file);
        config.apply_env();
        Ok(config)
    }

    /// Built-in defaults only; neither `host.toml` nor the environment is read.
    pub fn defaults(state_dir: PathBuf) -> Self {
        Self {
            repository_dir: state_dir.join("units"),
            unit_list: Vec::new(),
            jobs_path: state_dir.join("jobs.json"),
            lock_path: state_dir.join("mhd.pid"),
            log_dir: state_dir.join("logs"),
            host_version: env::HOST_VERSION.to_string(),
            schema_version: None,
            default_delay: DEFAULT_DELAY,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
            check_updates: true,
            allow_admin: false,
            actor: DEFAULT_ACTOR.to_string(),
            state_dir,
        }
    }

    fn apply_file(&mut self, file: HostFile) {
        if let Some(repository) = file.repository {
            self.repository_dir =
                if repository.is_relative() { self.state_dir.join(repository) } else { repository };
        }
        if !file.unit_list.is_empty() {
            self.unit_list = file.unit_list;
        }
        if file.schema_version.is_some() {
            self.schema_version = file.schema_version;
        }
        if let Some(ms) = file.default_delay_ms {
            self.default_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.update_timeout_ms {
            self.update_timeout = Duration::from_millis(ms);
        }
        self.check_updates = file.check_updates.unwrap_or(self.check_updates);
        self.allow_admin = file.allow_admin.unwrap_or(self.allow_admin);
    }

    fn apply_env(&mut self) {
        if let Some(dir) = env::repository_dir() {
            self.repository_dir = dir;
        }
        if let Some(list) = env::unit_list() {
            self.unit_list = list;
        }
        if let Some(delay) = env::default_delay() {
            self.default_delay = delay;
        }
        if let Some(timeout) = env::update_timeout() {
            self.update_timeout = timeout;
        }
        self.check_updates = env::check_updates().unwrap_or(self.check_updates);
        self.allow_admin = env::allow_admin().unwrap_or(self.allow_admin);
        if let Some(actor) = env::actor() {
            self.actor = actor;
        }
    }
}

fn read_host_file(path: &Path) -> Result<HostFile, LifecycleError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HostFile::default()),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&text).map_err(|source| LifecycleError::Config { path: path.to_path_buf(), source })
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub host: Arc<Host<SystemClock>>,
    /// When daemon started
    pub start_time: Instant,
}

impl DaemonState {
    /// Shut the host down and remove the PID file.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        self.host.shutdown().await;

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Invalid {}: {source}", path.display())]
    Config { path: PathBuf, source: toml::de::Error },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Unit administration is disabled (set MH_ALLOW_ADMIN)")]
    AdminDisabled,

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Update check error: {0}")]
    Update(#[from] UpdateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
