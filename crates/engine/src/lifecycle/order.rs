// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency ordering of units.

use mh_core::{is_version_satisfied, UnitId};
use mh_manifest::UnitDescriptor;
use std::collections::{HashMap, HashSet};

/// Versions of the running host that units may require.
#[derive(Debug, Clone, Default)]
pub struct HostVersions {
    pub host: String,
    /// `None` disables schema-version checks.
    pub schema: Option<String>,
}

/// Units in start order, plus those that cannot start and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub order: Vec<UnitId>,
    pub excluded: Vec<(UnitId, String)>,
}

/// Topologically sort `units` by `require_units`.
///
/// A dependency is satisfied by another candidate or by a unit in
/// `available` (already started). Units with a missing dependency, an
/// unsatisfied version requirement, or on a cycle are excluded, and so is
/// everything that depends on them. Ties keep the input order.
pub fn resolve_order(units: &[&UnitDescriptor], available: &HashSet<UnitId>, versions: &HostVersions) -> Resolution {
    let candidates: HashSet<&UnitId> = units.iter().map(|u| &u.id).collect();
    let mut excluded: HashMap<UnitId, String> = HashMap::new();

    for unit in units {
        if let Some(reason) = unmet_requirement(unit, &candidates, available, versions) {
            excluded.insert(unit.id.clone(), reason);
        }
    }

    // exclusion spreads to dependents until nothing changes
    loop {
        let mut changed = false;
        for unit in units {
            if excluded.contains_key(&unit.id) {
                continue;
            }
            if let Some(dep) = unit.require_units.iter().find(|d| excluded.contains_key(*d)) {
                excluded.insert(unit.id.clone(), format!("requires unit '{dep}' which cannot start"));
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut placed: HashSet<UnitId> = HashSet::new();
    let mut order = Vec::new();
    loop {
        let next = units.iter().find(|u| {
            !excluded.contains_key(&u.id)
                && !placed.contains(&u.id)
                && u.require_units.iter().all(|d| placed.contains(d) || available.contains(d))
        });
        let Some(unit) = next else {
            break;
        };
        placed.insert(unit.id.clone());
        order.push(unit.id.clone());
    }

    let stuck: Vec<&UnitId> =
        units.iter().map(|u| &u.id).filter(|id| !excluded.contains_key(*id) && !placed.contains(*id)).collect();
    if !stuck.is_empty() {
        let names: Vec<&str> = stuck.iter().map(|id| id.as_str()).collect();
        let reason = format!("dependency cycle among: {}", names.join(", "));
        for id in stuck {
            excluded.insert(id.clone(), reason.clone());
        }
    }

    let excluded = units
        .iter()
        .filter_map(|u| excluded.get(&u.id).map(|reason| (u.id.clone(), reason.clone())))
        .collect();
    Resolution { order, excluded }
}

fn unmet_requirement(
    unit: &UnitDescriptor,
    candidates: &HashSet<&UnitId>,
    available: &HashSet<UnitId>,
    versions: &HostVersions,
) -> Option<String> {
    if !is_version_satisfied(unit.require_host_version.as_deref(), &versions.host) {
        return Some(format!(
            "requires host version {} (running {})",
            unit.require_host_version.as_deref().unwrap_or_default(),
            versions.host
        ));
    }
    if let (Some(required), Some(schema)) = (unit.require_schema_version.as_deref(), versions.schema.as_deref()) {
        if !is_version_satisfied(Some(required), schema) {
            return Some(format!("requires schema version {required} (database is at {schema})"));
        }
    }
    unit.require_units
        .iter()
        .find(|d| !candidates.contains(d) && !available.contains(*d))
        .map(|missing| format!("requires unit '{missing}' which is not installed"))
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
