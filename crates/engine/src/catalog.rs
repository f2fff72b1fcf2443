// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linked code: the process-wide table of constructors keyed by symbol name.
//!
//! Archives only name their symbols. The host links a constructor for each
//! symbol it can run; an execution context decides which symbols are
//! visible to a unit, and the catalog builds the instance.

use crate::context::ExecutionContext;
use async_trait::async_trait;
use mh_storage::JobDefinition;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Error raised by unit-supplied code.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A unit's start/stop hook.
pub trait Activator: Send {
    fn started(&mut self, ctx: &ExecutionContext) -> Result<(), HookError>;

    /// Errors are logged; stopping always proceeds.
    fn stopped(&mut self) -> Result<(), HookError> {
        Ok(())
    }
}

/// A handler contributed to a named extension point.
pub trait Extension: Send + Sync {
    /// Content rendered into the extension point, if any.
    fn content(&self, params: &BTreeMap<String, String>) -> Option<String>;
}

/// Body of a background job.
#[async_trait]
pub trait Task: Send + Sync {
    async fn execute(&self, job: &JobDefinition) -> Result<(), HookError>;

    /// Called when the job's binding is cancelled.
    fn shutdown(&self) {}
}

/// A constructed symbol.
pub enum Instance {
    Activator(Box<dyn Activator>),
    Extension(Arc<dyn Extension>),
    Task(Arc<dyn Task>),
}

impl Instance {
    pub fn kind(&self) -> &'static str {
        match self {
            Instance::Activator(_) => "activator",
            Instance::Extension(_) => "extension",
            Instance::Task(_) => "task",
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance::{}", self.kind())
    }
}

pub type Constructor = Arc<dyn Fn() -> Result<Instance, HookError> + Send + Sync>;

#[derive(Default)]
pub struct CodeCatalog {
    constructors: RwLock<HashMap<String, Constructor>>,
}

impl CodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a raw constructor. Relinking a name replaces the previous one.
    pub fn link(&self, name: impl Into<String>, constructor: Constructor) {
        self.constructors.write().insert(name.into(), constructor);
    }

    pub fn link_activator<A, F>(&self, name: impl Into<String>, make: F)
    where
        A: Activator + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.link(name, Arc::new(move || Ok(Instance::Activator(Box::new(make())))));
    }

    pub fn link_extension<E, F>(&self, name: impl Into<String>, make: F)
    where
        E: Extension + 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.link(name, Arc::new(move || Ok(Instance::Extension(Arc::new(make())))));
    }

    pub fn link_task<T, F>(&self, name: impl Into<String>, make: F)
    where
        T: Task + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.link(name, Arc::new(move || Ok(Instance::Task(Arc::new(make())))));
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn unlink(&self, name: &str) -> bool {
        self.constructors.write().remove(name).is_some()
    }

    pub fn constructor(&self, name: &str) -> Option<Constructor> {
        self.constructors.read().get(name).cloned()
    }
}

impl std::fmt::Debug for CodeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("CodeCatalog").field("linked", &names).finish()
    }
}
