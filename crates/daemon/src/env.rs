// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Host version units are checked against
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve state directory: MH_STATE_DIR > XDG_STATE_HOME/mh > ~/.local/state/mh
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MH_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("mh"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/mh"))
}

/// Unit repository override
pub fn repository_dir() -> Option<PathBuf> {
    std::env::var("MH_REPOSITORY_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Explicit archive list (space separated). When set, the repository
/// directory is not scanned.
pub fn unit_list() -> Option<Vec<PathBuf>> {
    let raw = std::env::var("MH_UNIT_LIST").ok()?;
    let paths: Vec<PathBuf> = raw.split_whitespace().map(PathBuf::from).collect();
    if paths.is_empty() {
        None
    } else {
        Some(paths)
    }
}

/// Delay before the first firing of a repeating job without a start time
pub fn default_delay() -> Option<Duration> {
    duration_ms("MH_DEFAULT_DELAY_MS")
}

/// Timeout for each update document request
pub fn update_timeout() -> Option<Duration> {
    duration_ms("MH_UPDATE_TIMEOUT_MS")
}

pub fn check_updates() -> Option<bool> {
    flag("MH_CHECK_UPDATES")
}

/// Allow installing and uninstalling unit archives at runtime
pub fn allow_admin() -> Option<bool> {
    flag("MH_ALLOW_ADMIN")
}

/// Mirror daemon logs to stderr
pub fn log_stderr() -> bool {
    flag("MH_LOG_STDERR").unwrap_or(false)
}

/// Actor name stamped on job definitions saved by the daemon
pub fn actor() -> Option<String> {
    std::env::var("MH_ACTOR").ok().filter(|s| !s.is_empty())
}

fn duration_ms(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

fn flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
