// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use mh_core::SystemClock;
use mh_engine::{CodeCatalog, HostCodebase};
use tracing::info;

use crate::host::Host;

use super::{Config, DaemonState, LifecycleError};

/// Start the daemon: take the PID lock, build the host, start units.
///
/// The timer loop and update sweep are left to the caller so that startup
/// stays usable outside a running tokio runtime.
pub fn startup(
    config: &Config,
    catalog: Arc<CodeCatalog>,
    codebase: Arc<HostCodebase>,
) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config, catalog, codebase) {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock;
            // the PID file belongs to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(
    config: &Config,
    catalog: Arc<CodeCatalog>,
    codebase: Arc<HostCodebase>,
) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory (needed for the lock)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST. Open without truncating so a running
    // daemon's PID survives a failed attempt.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Create directories
    std::fs::create_dir_all(&config.repository_dir)?;
    std::fs::create_dir_all(&config.log_dir)?;

    // 4. Build host and start units
    let host = Host::new(config.clone(), catalog, codebase, SystemClock)?;
    let report = host.startup()?;

    info!(
        started = report.started.len(),
        failed = report.failed.len(),
        pid = std::process::id(),
        "Daemon started"
    );

    Ok(DaemonState { config: config.clone(), lock_file, host: Arc::new(host), start_time: Instant::now() })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
