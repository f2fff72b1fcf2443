// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store abstraction and the in-memory implementation

use crate::job::JobDefinition;
use mh_core::JobId;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("a job named '{0}' already exists")]
    DuplicateName(String),
    #[error("job '{0}' has not been saved yet")]
    Unsaved(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CRUD over persisted job definitions. The scheduler never assumes a
/// particular storage engine.
pub trait JobStore: Send + Sync {
    /// All definitions, ordered by id.
    fn tasks(&self) -> Result<Vec<JobDefinition>, StoreError>;

    fn task(&self, id: JobId) -> Result<Option<JobDefinition>, StoreError>;

    fn task_by_name(&self, name: &str) -> Result<Option<JobDefinition>, StoreError>;

    /// Insert a new definition and write the assigned id back into `def`.
    fn create(&self, def: &mut JobDefinition) -> Result<JobId, StoreError>;

    fn update(&self, def: &JobDefinition) -> Result<(), StoreError>;

    fn delete(&self, id: JobId) -> Result<(), StoreError>;
}

/// Id-keyed table shared by the store implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct JobTable {
    pub(crate) next_id: u64,
    pub(crate) tasks: BTreeMap<JobId, JobDefinition>,
}

impl JobTable {
    pub(crate) fn by_name(&self, name: &str) -> Option<&JobDefinition> {
        self.tasks.values().find(|t| t.name == name)
    }

    pub(crate) fn create(&mut self, def: &mut JobDefinition) -> Result<JobId, StoreError> {
        if self.by_name(&def.name).is_some() {
            return Err(StoreError::DuplicateName(def.name.clone()));
        }
        let start = self.tasks.keys().next_back().map_or(0, |id| id.get());
        self.next_id = self.next_id.max(start) + 1;
        let id = JobId(self.next_id);
        def.id = Some(id);
        self.tasks.insert(id, def.clone());
        Ok(id)
    }

    pub(crate) fn update(&mut self, def: &JobDefinition) -> Result<(), StoreError> {
        let id = def.id.ok_or_else(|| StoreError::Unsaved(def.name.clone()))?;
        if !self.tasks.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if self.tasks.values().any(|t| t.name == def.name && t.id != def.id) {
            return Err(StoreError::DuplicateName(def.name.clone()));
        }
        self.tasks.insert(id, def.clone());
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: JobId) -> Result<(), StoreError> {
        self.tasks.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }
}

/// Process-local store; contents are lost when the host exits.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    table: Mutex<JobTable>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn tasks(&self) -> Result<Vec<JobDefinition>, StoreError> {
        Ok(self.table.lock().tasks.values().cloned().collect())
    }

    fn task(&self, id: JobId) -> Result<Option<JobDefinition>, StoreError> {
        Ok(self.table.lock().tasks.get(&id).cloned())
    }

    fn task_by_name(&self, name: &str) -> Result<Option<JobDefinition>, StoreError> {
        Ok(self.table.lock().by_name(name).cloned())
    }

    fn create(&self, def: &mut JobDefinition) -> Result<JobId, StoreError> {
        self.table.lock().create(def)
    }

    fn update(&self, def: &JobDefinition) -> Result<(), StoreError> {
        self.table.lock().update(def)
    }

    fn delete(&self, id: JobId) -> Result<(), StoreError> {
        self.table.lock().delete(id)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
