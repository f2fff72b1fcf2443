// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extension registry: point name → ordered handlers from started units.

use crate::catalog::Extension;
use crate::context::{ExecutionContext, ResolveError};
use indexmap::IndexMap;
use mh_core::UnitId;
use mh_manifest::UnitDescriptor;
use parking_lot::RwLock;
use std::sync::Arc;

/// A handler instance tagged with its point and owning unit.
#[derive(Clone)]
pub struct RegisteredExtension {
    pub point: String,
    pub unit_id: UnitId,
    pub class: String,
    pub handler: Arc<dyn Extension>,
}

impl std::fmt::Debug for RegisteredExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredExtension")
            .field("point", &self.point)
            .field("unit_id", &self.unit_id)
            .field("class", &self.class)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    points: RwLock<IndexMap<String, Vec<RegisteredExtension>>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize every extension the unit declares and append them in
    /// declaration order. Either all are registered or none are.
    pub fn register(&self, unit: &UnitDescriptor, ctx: &ExecutionContext) -> Result<usize, ResolveError> {
        let mut staged = Vec::with_capacity(unit.extensions.len());
        for decl in &unit.extensions {
            let handler = ctx.extension(&decl.class)?;
            staged.push(RegisteredExtension {
                point: decl.point.clone(),
                unit_id: unit.id.clone(),
                class: decl.class.clone(),
                handler,
            });
        }

        let count = staged.len();
        let mut points = self.points.write();
        remove_unit(&mut points, &unit.id);
        for ext in staged {
            points.entry(ext.point.clone()).or_default().push(ext);
        }
        if count > 0 {
            tracing::debug!(unit_id = %unit.id, count, "registered extensions");
        }
        Ok(count)
    }

    /// Remove every entry tagged with `unit_id`. Returns how many were removed.
    pub fn unregister(&self, unit_id: &UnitId) -> usize {
        let removed = remove_unit(&mut self.points.write(), unit_id);
        if removed > 0 {
            tracing::debug!(unit_id = %unit_id, removed, "unregistered extensions");
        }
        removed
    }

    /// Handlers for `point` in registration order; empty if none.
    pub fn lookup(&self, point: &str) -> Vec<RegisteredExtension> {
        self.points.read().get(point).cloned().unwrap_or_default()
    }

    pub fn points(&self) -> Vec<String> {
        self.points.read().keys().cloned().collect()
    }

    pub fn count_for_unit(&self, unit_id: &UnitId) -> usize {
        self.points.read().values().flatten().filter(|e| &e.unit_id == unit_id).count()
    }
}

fn remove_unit(points: &mut IndexMap<String, Vec<RegisteredExtension>>, unit_id: &UnitId) -> usize {
    let mut removed = 0;
    for list in points.values_mut() {
        let before = list.len();
        list.retain(|e| &e.unit_id != unit_id);
        removed += before - list.len();
    }
    points.retain(|_, list| !list.is_empty());
    removed
}

#[cfg(test)]
#[path = "extension_tests.rs"]
mod tests;
