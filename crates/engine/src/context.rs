// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Isolated execution contexts.
//!
//! Each loaded unit owns one context holding its archive's symbols and
//! resources plus ordered handles to the contexts of the units it requires.
//! Lookup order is: own archive, each dependency in declaration order
//! (depth-first, transitively), then the host code base. Units outside the
//! dependency closure are never consulted.

use crate::catalog::{Activator, CodeCatalog, Constructor, Extension, HookError, Instance, Task};
use indexmap::IndexMap;
use mh_core::UnitId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("symbol '{0}' is not visible from this context")]
    NotFound(String),
    #[error("symbol '{name}' from {origin} has no linked constructor")]
    NotLinked { name: String, origin: Origin },
    #[error("execution context of unit '{0}' has been destroyed")]
    Destroyed(UnitId),
    #[error("symbol '{name}' is {actual}, expected {expected}")]
    WrongKind { name: String, expected: &'static str, actual: &'static str },
    #[error("failed to instantiate '{name}': {source}")]
    Instantiation {
        name: String,
        #[source]
        source: HookError,
    },
}

/// Where a symbol was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Unit(UnitId),
    Host,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Unit(id) => write!(f, "unit '{id}'"),
            Origin::Host => f.write_str("host"),
        }
    }
}

/// A visible, linked symbol ready to be instantiated.
pub struct Resolved {
    pub name: String,
    pub origin: Origin,
    constructor: Constructor,
}

impl Resolved {
    pub fn instantiate(&self) -> Result<Instance, ResolveError> {
        (self.constructor)().map_err(|source| ResolveError::Instantiation {
            name: self.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved").field("name", &self.name).field("origin", &self.origin).finish()
    }
}

/// Symbols and resources owned by the host process itself.
#[derive(Debug, Default)]
pub struct HostCodebase {
    symbols: RwLock<BTreeSet<String>>,
    resources: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl HostCodebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_symbol(&self, name: impl Into<String>) {
        self.symbols.write().insert(name.into());
    }

    pub fn add_resource(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.write().insert(name.into(), content.into());
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.read().contains(name)
    }

    /// Resolve against host symbols only.
    pub fn resolve(&self, catalog: &CodeCatalog, name: &str) -> Result<Resolved, ResolveError> {
        if !self.has_symbol(name) {
            return Err(ResolveError::NotFound(name.to_string()));
        }
        match catalog.constructor(name) {
            Some(constructor) => Ok(Resolved { name: name.to_string(), origin: Origin::Host, constructor }),
            None => Err(ResolveError::NotLinked { name: name.to_string(), origin: Origin::Host }),
        }
    }

    fn resource(&self, name: &str) -> Option<Vec<u8>> {
        self.resources.read().get(name).cloned()
    }
}

pub struct ExecutionContext {
    unit_id: UnitId,
    symbols: BTreeSet<String>,
    resources: BTreeMap<String, Vec<u8>>,
    dependencies: Vec<Arc<ExecutionContext>>,
    host: Arc<HostCodebase>,
    catalog: Arc<CodeCatalog>,
    destroyed: AtomicBool,
}

impl ExecutionContext {
    pub fn new(
        unit_id: UnitId,
        symbols: BTreeSet<String>,
        resources: BTreeMap<String, Vec<u8>>,
        dependencies: Vec<Arc<ExecutionContext>>,
        host: Arc<HostCodebase>,
        catalog: Arc<CodeCatalog>,
    ) -> Self {
        Self {
            unit_id,
            symbols,
            resources,
            dependencies,
            host,
            catalog,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    /// Ids of the directly required units, in declaration order.
    pub fn dependency_ids(&self) -> Vec<UnitId> {
        self.dependencies.iter().map(|d| d.unit_id.clone()).collect()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Refuse all further lookups. Handles held elsewhere stay valid but inert.
    pub fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            tracing::debug!(unit_id = %self.unit_id, "destroyed execution context");
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Resolved, ResolveError> {
        if self.is_destroyed() {
            return Err(ResolveError::Destroyed(self.unit_id.clone()));
        }
        let mut found = None;
        self.walk(&mut HashSet::new(), &mut |ctx: &ExecutionContext| {
            if ctx.symbols.contains(name) {
                found = Some(Origin::Unit(ctx.unit_id.clone()));
                true
            } else {
                false
            }
        });
        let origin = match found {
            Some(origin) => origin,
            None if self.host.has_symbol(name) => Origin::Host,
            None => return Err(ResolveError::NotFound(name.to_string())),
        };
        match self.catalog.constructor(name) {
            Some(constructor) => Ok(Resolved { name: name.to_string(), origin, constructor }),
            None => Err(ResolveError::NotLinked { name: name.to_string(), origin }),
        }
    }

    /// Resource bytes, searched in the same order as symbols.
    pub fn resource(&self, name: &str) -> Option<Vec<u8>> {
        if self.is_destroyed() {
            return None;
        }
        let mut found = None;
        self.walk(&mut HashSet::new(), &mut |ctx: &ExecutionContext| match ctx.resources.get(name) {
            Some(bytes) => {
                found = Some(bytes.clone());
                true
            }
            None => false,
        });
        found.or_else(|| self.host.resource(name))
    }

    pub fn instantiate(&self, name: &str) -> Result<Instance, ResolveError> {
        self.resolve(name)?.instantiate()
    }

    pub fn activator(&self, name: &str) -> Result<Box<dyn Activator>, ResolveError> {
        match self.instantiate(name)? {
            Instance::Activator(a) => Ok(a),
            other => Err(wrong_kind(name, "activator", &other)),
        }
    }

    pub fn extension(&self, name: &str) -> Result<Arc<dyn Extension>, ResolveError> {
        match self.instantiate(name)? {
            Instance::Extension(e) => Ok(e),
            other => Err(wrong_kind(name, "extension", &other)),
        }
    }

    pub fn task(&self, name: &str) -> Result<Arc<dyn Task>, ResolveError> {
        match self.instantiate(name)? {
            Instance::Task(t) => Ok(t),
            other => Err(wrong_kind(name, "task", &other)),
        }
    }

    /// Depth-first visit of this context and its live dependency closure.
    /// Stops as soon as `visit` returns true.
    fn walk(&self, seen: &mut HashSet<UnitId>, visit: &mut dyn FnMut(&ExecutionContext) -> bool) -> bool {
        if !seen.insert(self.unit_id.clone()) {
            return false;
        }
        if visit(self) {
            return true;
        }
        for dep in &self.dependencies {
            if dep.is_destroyed() {
                continue;
            }
            if dep.walk(seen, visit) {
                return true;
            }
        }
        false
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("unit_id", &self.unit_id)
            .field("symbols", &self.symbols.len())
            .field("resources", &self.resources.len())
            .field("dependencies", &self.dependency_ids())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

fn wrong_kind(name: &str, expected: &'static str, actual: &Instance) -> ResolveError {
    ResolveError::WrongKind { name: name.to_string(), expected, actual: actual.kind() }
}

/// Live contexts keyed by unit, in creation order.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: RwLock<IndexMap<UnitId, Arc<ExecutionContext>>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &UnitId) -> Option<Arc<ExecutionContext>> {
        self.contexts.read().get(id).cloned()
    }

    pub fn insert(&self, ctx: Arc<ExecutionContext>) {
        self.contexts.write().insert(ctx.unit_id.clone(), ctx);
    }

    /// Remove and destroy the unit's context.
    pub fn remove(&self, id: &UnitId) -> Option<Arc<ExecutionContext>> {
        let ctx = self.contexts.write().shift_remove(id)?;
        ctx.destroy();
        Some(ctx)
    }

    pub fn all(&self) -> Vec<Arc<ExecutionContext>> {
        self.contexts.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
