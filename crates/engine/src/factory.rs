// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns a job definition's task class into a runnable task.

use crate::catalog::{CodeCatalog, Instance, Task};
use crate::context::{ContextRegistry, HostCodebase, Origin, ResolveError};
use mh_storage::JobDefinition;
use std::sync::Arc;

/// A resolved task plus where its code came from. The scheduler uses the
/// origin to cancel the binding when that unit stops.
#[derive(Clone)]
pub struct TaskInstance {
    pub task: Arc<dyn Task>,
    pub origin: Origin,
}

impl std::fmt::Debug for TaskInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInstance").field("origin", &self.origin).finish()
    }
}

pub trait TaskFactory: Send + Sync {
    /// `Ok(None)` means the task's code is not currently available, e.g.
    /// its owning unit is not started.
    fn create_task(&self, def: &JobDefinition) -> Result<Option<TaskInstance>, ResolveError>;
}

/// Resolves tasks through the live execution contexts.
///
/// A job owned by a unit resolves only inside that unit's context. Other
/// jobs try the host first, then each started unit in start order.
#[derive(Debug)]
pub struct ContextTaskFactory {
    contexts: Arc<ContextRegistry>,
    host: Arc<HostCodebase>,
    catalog: Arc<CodeCatalog>,
}

impl ContextTaskFactory {
    pub fn new(contexts: Arc<ContextRegistry>, host: Arc<HostCodebase>, catalog: Arc<CodeCatalog>) -> Self {
        Self { contexts, host, catalog }
    }
}

impl TaskFactory for ContextTaskFactory {
    fn create_task(&self, def: &JobDefinition) -> Result<Option<TaskInstance>, ResolveError> {
        if let Some(owner) = &def.owner_unit {
            let Some(ctx) = self.contexts.get(owner) else {
                tracing::warn!(job = %def.label(), unit_id = %owner, "owning unit is not started");
                return Ok(None);
            };
            let resolved = ctx.resolve(&def.task_class)?;
            return into_task(&def.task_class, resolved.origin.clone(), resolved.instantiate()?).map(Some);
        }

        match self.host.resolve(&self.catalog, &def.task_class) {
            Ok(resolved) => return into_task(&def.task_class, Origin::Host, resolved.instantiate()?).map(Some),
            Err(ResolveError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        for ctx in self.contexts.all() {
            match ctx.resolve(&def.task_class) {
                Ok(resolved) => {
                    let origin = resolved.origin.clone();
                    return into_task(&def.task_class, origin, resolved.instantiate()?).map(Some);
                }
                Err(ResolveError::NotFound(_) | ResolveError::Destroyed(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(ResolveError::NotFound(def.task_class.clone()))
    }
}

fn into_task(name: &str, origin: Origin, instance: Instance) -> Result<TaskInstance, ResolveError> {
    match instance {
        Instance::Task(task) => Ok(TaskInstance { task, origin }),
        other => Err(ResolveError::WrongKind { name: name.to_string(), expected: "task", actual: other.kind() }),
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
