// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for activators, extensions, and tasks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::catalog::{Activator, Extension, HookError, Task};
use crate::context::ExecutionContext;
use async_trait::async_trait;
use mh_storage::JobDefinition;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered record of hook calls, shared between doubles and assertions.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Logs `start:<unit>` and `stop:<unit>`; optionally fails either hook.
#[derive(Debug, Clone)]
pub struct RecordingActivator {
    pub unit: String,
    pub log: EventLog,
    pub fail_start: bool,
    pub fail_stop: bool,
}

impl RecordingActivator {
    pub fn new(unit: &str, log: &EventLog) -> Self {
        Self { unit: unit.to_string(), log: log.clone(), fail_start: false, fail_stop: false }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }
}

impl Activator for RecordingActivator {
    fn started(&mut self, _ctx: &ExecutionContext) -> Result<(), HookError> {
        self.log.push(format!("start:{}", self.unit));
        if self.fail_start {
            return Err(format!("{} activator refused to start", self.unit).into());
        }
        Ok(())
    }

    fn stopped(&mut self) -> Result<(), HookError> {
        self.log.push(format!("stop:{}", self.unit));
        if self.fail_stop {
            return Err(format!("{} activator failed to stop", self.unit).into());
        }
        Ok(())
    }
}

/// Extension that renders a fixed string.
#[derive(Debug, Clone)]
pub struct StaticExtension(pub String);

impl Extension for StaticExtension {
    fn content(&self, _params: &BTreeMap<String, String>) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Logs `run:<job name>` on each execution; optionally fails.
#[derive(Debug, Clone)]
pub struct RecordingTask {
    pub log: EventLog,
    pub fail: bool,
}

impl RecordingTask {
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone(), fail: false }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Task for RecordingTask {
    async fn execute(&self, job: &JobDefinition) -> Result<(), HookError> {
        self.log.push(format!("run:{}", job.name));
        if self.fail {
            return Err(format!("job {} failed", job.name).into());
        }
        Ok(())
    }

    fn shutdown(&self) {
        self.log.push("shutdown");
    }
}
