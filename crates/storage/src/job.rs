// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted background job definition

use chrono::{DateTime, Utc};
use mh_core::{JobId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A schedulable unit of background work, as stored.
///
/// `repeat_interval` is in seconds; zero means the job fires once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Assigned by the store on create
    #[serde(default)]
    pub id: Option<JobId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Symbol name resolved through an execution context
    pub task_class: String,
    /// Unit that declared this job, if any
    #[serde(default)]
    pub owner_unit: Option<UnitId>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repeat_interval: u64,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub start_on_startup: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[serde(default)]
    pub date_changed: Option<DateTime<Utc>>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, task_class: impl Into<String>) -> Self {
        Self { name: name.into(), task_class: task_class.into(), ..Default::default() }
    }

    pub fn is_one_shot(&self) -> bool {
        self.repeat_interval == 0
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Human-readable label used in log fields: `name#id` or just `name`.
    pub fn label(&self) -> String {
        match self.id {
            Some(id) => format!("{}#{id}", self.name),
            None => self.name.clone(),
        }
    }
}

mh_core::builder! {
    pub struct JobDefinitionBuilder => JobDefinition {
        into {
            name: String = "job",
            description: String = "",
            task_class: String = "test.Task",
        }
        set {
            repeat_interval: u64 = 0,
            started: bool = false,
            start_on_startup: bool = false,
            properties: BTreeMap<String, String> = BTreeMap::new(),
        }
        option {
            id: JobId = None,
            owner_unit: UnitId = None,
            start_time: DateTime<Utc> = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
