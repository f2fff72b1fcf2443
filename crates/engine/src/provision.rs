// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Privileges and configuration defaults that units declare and the host
//! must create before the unit starts.

use crate::catalog::HookError;
use mh_core::UnitId;
use mh_manifest::{ConfigDecl, PrivilegeDecl};
use parking_lot::RwLock;
use std::collections::BTreeMap;

pub trait Provisioner: Send + Sync {
    /// Create the privilege if missing. Existing privileges are left as-is.
    fn ensure_privilege(&self, unit: &UnitId, privilege: &PrivilegeDecl) -> Result<(), HookError>;

    /// Record the default if the key has no value yet. Never overwrites.
    fn ensure_config_default(&self, unit: &UnitId, config: &ConfigDecl) -> Result<(), HookError>;
}

/// Host-local privilege and property tables.
#[derive(Debug, Default)]
pub struct MemoryProvisioner {
    privileges: RwLock<BTreeMap<String, String>>,
    properties: RwLock<BTreeMap<String, String>>,
}

impl MemoryProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_privilege(&self, name: &str) -> bool {
        self.privileges.read().contains_key(name)
    }

    pub fn privileges(&self) -> Vec<String> {
        self.privileges.read().keys().cloned().collect()
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.properties.read().get(key).cloned()
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }
}

impl Provisioner for MemoryProvisioner {
    fn ensure_privilege(&self, unit: &UnitId, privilege: &PrivilegeDecl) -> Result<(), HookError> {
        if privilege.name.trim().is_empty() {
            return Err(format!("unit '{unit}' declares a privilege with no name").into());
        }
        let mut privileges = self.privileges.write();
        if !privileges.contains_key(&privilege.name) {
            privileges.insert(privilege.name.clone(), privilege.description.clone().unwrap_or_default());
            tracing::debug!(unit_id = %unit, privilege = %privilege.name, "created privilege");
        }
        Ok(())
    }

    fn ensure_config_default(&self, unit: &UnitId, config: &ConfigDecl) -> Result<(), HookError> {
        if config.key.trim().is_empty() {
            return Err(format!("unit '{unit}' declares a config entry with no key").into());
        }
        let mut properties = self.properties.write();
        if !properties.contains_key(&config.key) {
            properties.insert(config.key.clone(), config.default.clone().unwrap_or_default());
            tracing::debug!(unit_id = %unit, key = %config.key, "recorded config default");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
