// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit descriptor model and `unit.toml` parsing.
//!
//! ```toml
//! [unit]
//! id = "ui.springmvc"
//! name = "Spring MVC UI"
//! version = "1.2.0"
//! activator = "org.example.ui.UiActivator"
//! require_units = ["ui"]
//!
//! [[extension]]
//! point = "admin.links"
//! class = "org.example.ui.AdminLinks"
//!
//! [[job]]
//! name = "Purge Sessions"
//! class = "org.example.ui.PurgeTask"
//! repeat_interval = 3600
//! start_on_startup = true
//! ```

use crate::error::ManifestError;
use chrono::{DateTime, Utc};
use mh_core::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// An extension point contribution: the class is instantiated lazily once
/// the unit's execution context exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDecl {
    pub point: String,
    pub class: String,
}

/// A background job declared by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDecl {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Seconds between firings; zero means one-shot
    #[serde(default)]
    pub repeat_interval: u64,
    /// RFC 3339 timestamp, written as a quoted string
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_on_startup: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDecl {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDecl {
    pub key: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Newer version advertised by a unit's update document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInfo {
    pub version: String,
    pub download_url: String,
}

/// In-memory description of one installable unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitDescriptor {
    pub id: UnitId,
    pub name: String,
    /// Namespace of the unit's own code, used to mark its frames in diagnostics
    pub package: String,
    pub version: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Start/stop hook class
    pub activator: Option<String>,
    pub update_url: Option<String>,
    pub require_units: Vec<UnitId>,
    pub require_host_version: Option<String>,
    pub require_schema_version: Option<String>,
    pub extensions: Vec<ExtensionDecl>,
    pub jobs: Vec<JobDecl>,
    pub privileges: Vec<PrivilegeDecl>,
    pub config: Vec<ConfigDecl>,
    pub mapping_files: Vec<String>,
    /// Archive the descriptor was read from
    pub archive: PathBuf,
    /// Filled in by the update checker when a newer version exists
    pub update: Option<UpdateInfo>,
    startup_error: Option<String>,
}

impl PartialEq for UnitDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for UnitDescriptor {}

impl UnitDescriptor {
    pub fn new(id: impl Into<UnitId>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            package: id.to_string(),
            id,
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// The unit id with dots replaced by slashes.
    pub fn id_as_path(&self) -> String {
        self.id.as_path()
    }

    pub fn startup_error(&self) -> Option<&str> {
        self.startup_error.as_deref()
    }

    pub fn has_startup_error(&self) -> bool {
        self.startup_error.is_some()
    }

    /// Record why the unit failed to start. An empty message is rejected.
    pub fn set_startup_error(&mut self, message: impl Into<String>) -> Result<(), ManifestError> {
        let message = message.into();
        if message.is_empty() {
            return Err(ManifestError::InvalidArgument(format!(
                "startup error for unit '{}' cannot be empty",
                self.id
            )));
        }
        self.startup_error = Some(message);
        Ok(())
    }

    pub fn clear_startup_error(&mut self) {
        self.startup_error = None;
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    unit: RawUnit,
    #[serde(default, rename = "extension")]
    extensions: Vec<ExtensionDecl>,
    #[serde(default, rename = "job")]
    jobs: Vec<JobDecl>,
    #[serde(default, rename = "privilege")]
    privileges: Vec<PrivilegeDecl>,
    #[serde(default)]
    config: Vec<ConfigDecl>,
}

#[derive(Deserialize)]
struct RawUnit {
    id: String,
    name: String,
    version: String,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    activator: Option<String>,
    #[serde(default)]
    update_url: Option<String>,
    #[serde(default)]
    require_units: Vec<String>,
    #[serde(default)]
    require_host_version: Option<String>,
    #[serde(default)]
    require_schema_version: Option<String>,
    #[serde(default)]
    mapping_files: Vec<String>,
}

/// Parse and validate the contents of a `unit.toml` file.
pub fn parse_descriptor(content: &str) -> Result<UnitDescriptor, ManifestError> {
    let raw: RawDescriptor = toml::from_str(content)?;
    let unit = raw.unit;

    validate_id(&unit.id)?;
    if unit.name.trim().is_empty() {
        return Err(ManifestError::Invalid(format!("unit '{}' requires a name", unit.id)));
    }
    validate_version(&unit.id, &unit.version)?;
    for required in &unit.require_units {
        validate_id(required)?;
        if *required == unit.id {
            return Err(ManifestError::Invalid(format!("unit '{}' requires itself", unit.id)));
        }
    }
    for ext in &raw.extensions {
        if ext.point.is_empty() || ext.class.is_empty() {
            return Err(ManifestError::Invalid(format!(
                "unit '{}' has an extension without point or class",
                unit.id
            )));
        }
    }
    let mut job_names = std::collections::HashSet::new();
    for job in &raw.jobs {
        if job.name.is_empty() || job.class.is_empty() {
            return Err(ManifestError::Invalid(format!(
                "unit '{}' has a job without name or class",
                unit.id
            )));
        }
        if !job_names.insert(job.name.as_str()) {
            return Err(ManifestError::Invalid(format!(
                "unit '{}' declares job '{}' twice",
                unit.id, job.name
            )));
        }
    }

    let package = unit.package.filter(|p| !p.is_empty()).unwrap_or_else(|| unit.id.clone());
    Ok(UnitDescriptor {
        id: UnitId::new(unit.id),
        name: unit.name,
        package,
        version: unit.version,
        author: unit.author,
        description: unit.description,
        activator: unit.activator.filter(|a| !a.is_empty()),
        update_url: unit.update_url.filter(|u| !u.is_empty()),
        require_units: unit.require_units.into_iter().map(UnitId::new).collect(),
        require_host_version: unit.require_host_version.filter(|v| !v.is_empty()),
        require_schema_version: unit.require_schema_version.filter(|v| !v.is_empty()),
        extensions: raw.extensions,
        jobs: raw.jobs,
        privileges: raw.privileges,
        config: raw.config,
        mapping_files: unit.mapping_files,
        archive: PathBuf::new(),
        update: None,
        startup_error: None,
    })
}

fn validate_id(id: &str) -> Result<(), ManifestError> {
    let valid = !id.is_empty()
        && id.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });
    if valid {
        Ok(())
    } else {
        Err(ManifestError::Invalid(format!("'{id}' is not a valid unit id")))
    }
}

fn validate_version(id: &str, version: &str) -> Result<(), ManifestError> {
    let valid = !version.is_empty()
        && version.split('.').all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(ManifestError::Invalid(format!("unit '{id}' has invalid version '{version}'")))
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
