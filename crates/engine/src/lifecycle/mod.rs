// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit registry and lifecycle.
//!
//! `UnitManager` owns every known unit descriptor and drives it through
//! `Discovered → Resolved → Loaded → Started → Stopped`, with `Errored`
//! holding the diagnostic of a failed resolve or start.

mod order;

pub use order::{resolve_order, HostVersions, Resolution};

use crate::catalog::{Activator, CodeCatalog, HookError};
use crate::context::{ContextRegistry, ExecutionContext, HostCodebase, ResolveError};
use crate::diagnostic::startup_diagnostic;
use crate::extension::ExtensionRegistry;
use crate::provision::Provisioner;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::update::{UpdateChecker, UpdateOutcome};
use indexmap::IndexMap;
use mh_core::{Clock, JobId, UnitId};
use mh_manifest::{
    DiscoveryReport, FindError, JobDecl, ManifestError, SkippedArchive, UnitArchive, UnitDescriptor,
    UpdateInfo,
};
use mh_storage::JobDefinition;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit '{0}' is not known")]
    NotFound(UnitId),
    #[error("unit '{0}' is already installed")]
    AlreadyInstalled(UnitId),
    #[error("unit '{0}' has a pending startup error; clear it before retrying")]
    StartupErrorPending(UnitId),
    #[error("unit '{unit}' cannot start: {reason}")]
    Unresolvable { unit: UnitId, reason: String },
    #[error("unit '{unit}' requires unit '{dependency}' which is not started")]
    DependencyNotStarted { unit: UnitId, dependency: UnitId },
    #[error("failed to provision unit '{unit}': {source}")]
    Provision {
        unit: UnitId,
        #[source]
        source: HookError,
    },
    #[error("activator '{class}' failed to start: {source}")]
    Activator {
        class: String,
        #[source]
        source: HookError,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Find(#[from] FindError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Discovered,
    Resolved,
    Loaded,
    Started,
    Stopped,
    Errored,
}

mh_core::simple_display! {
    UnitState {
        Discovered => "discovered",
        Resolved => "resolved",
        Loaded => "loaded",
        Started => "started",
        Stopped => "stopped",
        Errored => "errored",
    }
}

/// A unit as seen from outside the manager.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub descriptor: UnitDescriptor,
    pub state: UnitState,
}

/// Outcome of loading archives into the registry.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<UnitId>,
    pub skipped: Vec<SkippedArchive>,
}

/// Outcome of a bulk startup.
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    pub started: Vec<UnitId>,
    pub failed: Vec<(UnitId, String)>,
    pub jobs_scheduled: usize,
}

struct UnitEntry {
    descriptor: UnitDescriptor,
    symbols: BTreeSet<String>,
    resources: BTreeMap<String, Vec<u8>>,
    state: UnitState,
}

impl UnitEntry {
    fn from_archive(archive: UnitArchive) -> Self {
        Self {
            descriptor: archive.descriptor,
            symbols: archive.symbols,
            resources: archive.resources,
            state: UnitState::Discovered,
        }
    }
}

/// Everything `start` needs from an entry, copied out of the lock.
struct StartPlan {
    descriptor: UnitDescriptor,
    symbols: BTreeSet<String>,
    resources: BTreeMap<String, Vec<u8>>,
}

const START_FAILURE: &str = "Unable to start unit";

pub struct UnitManager<C: Clock> {
    entries: Mutex<IndexMap<UnitId, UnitEntry>>,
    /// Started units in start order
    started: Mutex<Vec<UnitId>>,
    activators: Mutex<HashMap<UnitId, Box<dyn Activator>>>,
    contexts: Arc<ContextRegistry>,
    extensions: Arc<ExtensionRegistry>,
    scheduler: Arc<Scheduler<C>>,
    provisioner: Arc<dyn Provisioner>,
    host: Arc<HostCodebase>,
    catalog: Arc<CodeCatalog>,
    versions: HostVersions,
    shutting_down: AtomicBool,
}

impl<C: Clock> UnitManager<C> {
    pub fn new(
        contexts: Arc<ContextRegistry>,
        scheduler: Arc<Scheduler<C>>,
        provisioner: Arc<dyn Provisioner>,
        host: Arc<HostCodebase>,
        catalog: Arc<CodeCatalog>,
        versions: HostVersions,
    ) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            started: Mutex::new(Vec::new()),
            activators: Mutex::new(HashMap::new()),
            contexts,
            extensions: Arc::new(ExtensionRegistry::new()),
            scheduler,
            provisioner,
            host,
            catalog,
            versions,
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn extensions(&self) -> &Arc<ExtensionRegistry> {
        &self.extensions
    }

    pub fn contexts(&self) -> &Arc<ContextRegistry> {
        &self.contexts
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<C>> {
        &self.scheduler
    }

    /// Scan `repository` (created if absent) and load every archive found.
    pub fn discover(&self, repository: &Path) -> Result<LoadReport, UnitError> {
        let report = mh_manifest::discover(repository)?;
        Ok(self.load(report))
    }

    /// Load an explicit list of archives instead of scanning a directory.
    pub fn discover_paths(&self, paths: &[PathBuf]) -> LoadReport {
        self.load(mh_manifest::discover_paths(paths))
    }

    fn load(&self, report: DiscoveryReport) -> LoadReport {
        let mut out = LoadReport { loaded: Vec::new(), skipped: report.skipped };
        let mut entries = self.entries.lock();
        for archive in report.units {
            let id = archive.descriptor.id.clone();
            if entries.get(&id).is_some_and(|e| e.state == UnitState::Started) {
                tracing::debug!(unit_id = %id, "unit already started, keeping loaded copy");
                continue;
            }
            tracing::info!(unit_id = %id, version = %archive.descriptor.version, "discovered unit");
            entries.insert(id.clone(), UnitEntry::from_archive(archive));
            out.loaded.push(id);
        }
        out
    }

    /// Order every startable unit by its dependencies. Excluded units are
    /// marked errored with the reason as their startup error.
    pub fn resolve(&self) -> Resolution {
        let started: HashSet<UnitId> = self.started.lock().iter().cloned().collect();
        let mut entries = self.entries.lock();
        let candidates: Vec<&UnitDescriptor> = entries
            .values()
            .filter(|e| e.state != UnitState::Started && !e.descriptor.has_startup_error())
            .map(|e| &e.descriptor)
            .collect();
        let resolution = resolve_order(&candidates, &started, &self.versions);

        for id in &resolution.order {
            if let Some(entry) = entries.get_mut(id) {
                entry.state = UnitState::Resolved;
            }
        }
        for (id, reason) in &resolution.excluded {
            if let Some(entry) = entries.get_mut(id) {
                tracing::warn!(unit_id = %id, reason = %reason, "unit cannot start");
                if let Err(e) = entry.descriptor.set_startup_error(reason.clone()) {
                    tracing::debug!(unit_id = %id, error = %e, "startup error not recorded");
                }
                entry.state = UnitState::Errored;
            }
        }
        resolution
    }

    /// Start one unit. Its dependencies must already be started.
    ///
    /// On failure everything the attempt registered is rolled back and the
    /// unit is marked errored with a diagnostic.
    pub fn start(&self, id: &UnitId) -> Result<(), UnitError> {
        let plan = {
            let entries = self.entries.lock();
            let entry = entries.get(id).ok_or_else(|| UnitError::NotFound(id.clone()))?;
            if entry.state == UnitState::Started {
                return Ok(());
            }
            if entry.descriptor.has_startup_error() {
                return Err(UnitError::StartupErrorPending(id.clone()));
            }
            StartPlan {
                descriptor: entry.descriptor.clone(),
                symbols: entry.symbols.clone(),
                resources: entry.resources.clone(),
            }
        };

        let StartPlan { descriptor, symbols, resources } = plan;
        if let Err(e) = self.run_start_steps(&descriptor, symbols, resources) {
            self.teardown(id, true);
            let diagnostic = startup_diagnostic(&descriptor.package, Some(START_FAILURE), &e);
            self.mark_errored(id, diagnostic);
            tracing::error!(unit_id = %id, error = %e, "failed to start unit");
            return Err(e);
        }
        Ok(())
    }

    fn run_start_steps(
        &self,
        unit: &UnitDescriptor,
        symbols: BTreeSet<String>,
        resources: BTreeMap<String, Vec<u8>>,
    ) -> Result<(), UnitError> {
        let id = &unit.id;
        self.check_requirements(unit)?;

        let ctx = match self.contexts.get(id) {
            Some(ctx) if !ctx.is_destroyed() => ctx,
            _ => {
                let mut dependencies = Vec::with_capacity(unit.require_units.len());
                for dep in &unit.require_units {
                    let ctx = self.contexts.get(dep).ok_or_else(|| UnitError::DependencyNotStarted {
                        unit: id.clone(),
                        dependency: dep.clone(),
                    })?;
                    dependencies.push(ctx);
                }
                let ctx = Arc::new(ExecutionContext::new(
                    id.clone(),
                    symbols,
                    resources,
                    dependencies,
                    Arc::clone(&self.host),
                    Arc::clone(&self.catalog),
                ));
                self.contexts.insert(Arc::clone(&ctx));
                ctx
            }
        };
        self.set_state(id, UnitState::Loaded);

        for privilege in &unit.privileges {
            self.provisioner
                .ensure_privilege(id, privilege)
                .map_err(|source| UnitError::Provision { unit: id.clone(), source })?;
        }
        for config in &unit.config {
            self.provisioner
                .ensure_config_default(id, config)
                .map_err(|source| UnitError::Provision { unit: id.clone(), source })?;
        }

        if let Some(class) = &unit.activator {
            let mut activator = ctx.activator(class)?;
            activator
                .started(&ctx)
                .map_err(|source| UnitError::Activator { class: class.clone(), source })?;
            self.activators.lock().insert(id.clone(), activator);
        }

        self.extensions.register(unit, &ctx)?;
        self.register_jobs(unit)?;

        self.set_state(id, UnitState::Started);
        {
            let mut started = self.started.lock();
            if !started.contains(id) {
                started.push(id.clone());
            }
        }
        tracing::info!(unit_id = %id, version = %unit.version, "started unit");
        Ok(())
    }

    fn check_requirements(&self, unit: &UnitDescriptor) -> Result<(), UnitError> {
        let started: HashSet<UnitId> = self.started.lock().iter().cloned().collect();
        for dep in &unit.require_units {
            if !started.contains(dep) {
                return Err(UnitError::DependencyNotStarted { unit: unit.id.clone(), dependency: dep.clone() });
            }
        }
        let resolution = resolve_order(&[unit], &started, &self.versions);
        match resolution.excluded.into_iter().next() {
            Some((unit, reason)) => Err(UnitError::Unresolvable { unit, reason }),
            None => Ok(()),
        }
    }

    /// Create store definitions for declared jobs that do not exist yet.
    /// Definitions created here are deleted again if a later one fails.
    fn register_jobs(&self, unit: &UnitDescriptor) -> Result<(), UnitError> {
        let mut created: Vec<JobId> = Vec::new();
        for decl in &unit.jobs {
            let result = match self.scheduler.task_by_name(&decl.name) {
                Ok(Some(_)) => Ok(None),
                Ok(None) => self.scheduler.save_task(&mut job_from_decl(&unit.id, decl)).map(Some),
                Err(e) => Err(e),
            };
            match result {
                Ok(Some(job)) => created.push(job),
                Ok(None) => {}
                Err(e) => {
                    for job in created {
                        if let Err(e) = self.scheduler.store().delete(job) {
                            tracing::warn!(unit_id = %unit.id, job = %job, error = %e, "failed to roll back job");
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        if !created.is_empty() {
            tracing::debug!(unit_id = %unit.id, count = created.len(), "registered declared jobs");
        }
        Ok(())
    }

    /// Stop a started unit. Started dependents stop first unless the host is
    /// shutting down. `is_failed_start` skips the stop hook.
    pub fn stop(&self, id: &UnitId, is_failed_start: bool) -> Result<(), UnitError> {
        let state = self.state(id).ok_or_else(|| UnitError::NotFound(id.clone()))?;
        if state != UnitState::Started && !is_failed_start {
            return Ok(());
        }
        if !self.shutting_down.load(Ordering::Acquire) {
            for dependent in self.started_dependents(id) {
                if let Err(e) = self.stop(&dependent, false) {
                    tracing::warn!(unit_id = %dependent, error = %e, "failed to stop dependent unit");
                }
            }
        }
        self.teardown(id, is_failed_start);
        self.set_state(id, UnitState::Stopped);
        tracing::info!(unit_id = %id, "stopped unit");
        Ok(())
    }

    /// Release everything a unit holds: stop hook (unless failed start),
    /// jobs, extensions, then the context.
    fn teardown(&self, id: &UnitId, is_failed_start: bool) {
        let activator = self.activators.lock().remove(id);
        if let Some(mut activator) = activator {
            if !is_failed_start {
                if let Err(e) = activator.stopped() {
                    tracing::warn!(unit_id = %id, error = %e, "stop hook failed");
                }
            }
        }
        self.scheduler.shutdown_unit_tasks(id);
        self.extensions.unregister(id);
        self.contexts.remove(id);
        self.started.lock().retain(|s| s != id);
    }

    /// Stop then start a unit, rescheduling the jobs it had running.
    pub fn restart(&self, id: &UnitId) -> Result<(), UnitError> {
        let jobs = self.scheduler.unit_tasks(id);
        self.stop(id, false)?;
        self.start(id)?;
        for mut def in jobs {
            if let Err(e) = self.scheduler.schedule_task(&mut def) {
                tracing::warn!(unit_id = %id, job = %def.label(), error = %e, "failed to reschedule job after restart");
            }
        }
        Ok(())
    }

    /// Resolve and start every startable unit, then schedule
    /// start-on-startup jobs. Failures are isolated per unit.
    pub fn startup(&self) -> StartupReport {
        self.shutting_down.store(false, Ordering::Release);
        let resolution = self.resolve();
        let mut report = StartupReport::default();
        for (id, reason) in resolution.excluded {
            report.failed.push((id, reason));
        }
        for id in resolution.order {
            match self.start(&id) {
                Ok(()) => report.started.push(id),
                Err(e) => report.failed.push((id, e.to_string())),
            }
        }
        report.jobs_scheduled = self.scheduler.on_startup();
        tracing::info!(started = report.started.len(), failed = report.failed.len(), "unit startup complete");
        report
    }

    /// Stop every started unit in reverse start order.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        let order: Vec<UnitId> = self.started.lock().iter().rev().cloned().collect();
        for id in order {
            if let Err(e) = self.stop(&id, false) {
                tracing::warn!(unit_id = %id, error = %e, "failed to stop unit");
            }
        }
        tracing::info!("all units stopped");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// The started unit that owns `path`, matched by the longest dotted
    /// prefix of its directory. `/ui/springmvc/css/ui.css` tries
    /// `ui.springmvc.css`, then `ui.springmvc`, then `ui`.
    pub fn unit_for_path(&self, path: &str) -> Result<Option<UnitId>, UnitError> {
        let end = match path.rfind('/') {
            Some(end) if end > 0 => end,
            _ => return Err(UnitError::InvalidArgument(format!("path '{path}' has no unit directory"))),
        };
        let dir = &path[..end];
        let mut candidate = dir.strip_prefix('/').unwrap_or(dir).replace('/', ".");
        let started = self.started.lock().clone();
        loop {
            if started.iter().any(|id| *id == *candidate) {
                return Ok(Some(UnitId::new(candidate)));
            }
            match candidate.rfind('.') {
                Some(dot) => candidate.truncate(dot),
                None => return Ok(None),
            }
        }
    }

    /// `path` relative to the unit's directory: `/ui/springmvc/css/ui.css`
    /// for unit `ui.springmvc` becomes `/css/ui.css`.
    pub fn path_for_resource(&self, unit: &UnitId, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        path.strip_prefix(unit.as_path().as_str()).unwrap_or(path).to_string()
    }

    /// All known units in discovery order.
    pub fn list(&self) -> Vec<UnitInfo> {
        self.entries
            .lock()
            .values()
            .map(|e| UnitInfo { descriptor: e.descriptor.clone(), state: e.state })
            .collect()
    }

    pub fn get(&self, id: &UnitId) -> Option<UnitInfo> {
        self.entries.lock().get(id).map(|e| UnitInfo { descriptor: e.descriptor.clone(), state: e.state })
    }

    pub fn state(&self, id: &UnitId) -> Option<UnitState> {
        self.entries.lock().get(id).map(|e| e.state)
    }

    /// Started units in start order.
    pub fn started_units(&self) -> Vec<UnitId> {
        self.started.lock().clone()
    }

    pub fn is_started(&self, id: &UnitId) -> bool {
        self.state(id) == Some(UnitState::Started)
    }

    /// Clear a pending startup error so the unit can be started again.
    pub fn clear_startup_error(&self, id: &UnitId) -> Result<(), UnitError> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(id).ok_or_else(|| UnitError::NotFound(id.clone()))?;
        entry.descriptor.clear_startup_error();
        if entry.state == UnitState::Errored {
            entry.state = UnitState::Discovered;
        }
        Ok(())
    }

    /// Write a new archive into `repository` and register its unit. The
    /// unit is not started.
    pub fn install(&self, repository: &Path, file_name: &str, bytes: &[u8]) -> Result<UnitId, UnitError> {
        let archive = mh_manifest::install_archive(repository, file_name, bytes)?;
        let id = archive.descriptor.id.clone();
        let mut entries = self.entries.lock();
        if entries.contains_key(&id) {
            drop(entries);
            if let Err(e) = mh_manifest::remove_archive(&archive.descriptor.archive) {
                tracing::warn!(unit_id = %id, error = %e, "failed to remove rejected archive");
            }
            return Err(UnitError::AlreadyInstalled(id));
        }
        entries.insert(id.clone(), UnitEntry::from_archive(archive));
        tracing::info!(unit_id = %id, file = file_name, "installed unit");
        Ok(id)
    }

    /// Stop the unit (and its dependents), delete its archive, and forget it.
    pub fn uninstall(&self, id: &UnitId) -> Result<(), UnitError> {
        self.stop(id, false)?;
        let archive = {
            let mut entries = self.entries.lock();
            let entry = entries.shift_remove(id).ok_or_else(|| UnitError::NotFound(id.clone()))?;
            entry.descriptor.archive
        };
        mh_manifest::remove_archive(&archive)?;
        tracing::info!(unit_id = %id, "uninstalled unit");
        Ok(())
    }

    pub fn set_update_info(&self, id: &UnitId, update: Option<UpdateInfo>) -> Result<(), UnitError> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(id).ok_or_else(|| UnitError::NotFound(id.clone()))?;
        entry.descriptor.update = update;
        Ok(())
    }

    /// Check every unit that has an update URL. Returns whether any newer
    /// version was found. Individual failures are logged and skipped.
    pub async fn check_for_updates(&self, checker: &UpdateChecker) -> bool {
        let units: Vec<UnitDescriptor> = self
            .entries
            .lock()
            .values()
            .filter(|e| e.descriptor.update_url.is_some())
            .map(|e| e.descriptor.clone())
            .collect();

        let mut found = false;
        for unit in units {
            let update = match checker.check_unit(&unit).await {
                Ok(UpdateOutcome::Available(info)) => {
                    found = true;
                    Some(info)
                }
                Ok(UpdateOutcome::UpToDate) => None,
                Ok(UpdateOutcome::Skipped | UpdateOutcome::Mismatch) => continue,
                Err(e) => {
                    tracing::warn!(unit_id = %unit.id, error = %e, "update check failed");
                    continue;
                }
            };
            if let Err(e) = self.set_update_info(&unit.id, update) {
                tracing::debug!(unit_id = %unit.id, error = %e, "unit vanished during update check");
            }
        }
        found
    }

    fn started_dependents(&self, id: &UnitId) -> Vec<UnitId> {
        let started = self.started.lock().clone();
        let entries = self.entries.lock();
        started
            .into_iter()
            .rev()
            .filter(|s| entries.get(s).is_some_and(|e| e.descriptor.require_units.contains(id)))
            .collect()
    }

    fn set_state(&self, id: &UnitId, state: UnitState) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.state = state;
        }
    }

    fn mark_errored(&self, id: &UnitId, diagnostic: String) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(id) {
            if let Err(e) = entry.descriptor.set_startup_error(diagnostic) {
                tracing::debug!(unit_id = %id, error = %e, "startup error not recorded");
            }
            entry.state = UnitState::Errored;
        }
    }
}

impl<C: Clock> std::fmt::Debug for UnitManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitManager")
            .field("units", &self.entries.lock().len())
            .field("started", &self.started_units())
            .finish()
    }
}

fn job_from_decl(unit: &UnitId, decl: &JobDecl) -> JobDefinition {
    JobDefinition {
        name: decl.name.clone(),
        description: decl.description.clone().unwrap_or_default(),
        task_class: decl.class.clone(),
        owner_unit: Some(unit.clone()),
        start_time: decl.start_time,
        repeat_interval: decl.repeat_interval,
        start_on_startup: decl.start_on_startup,
        properties: decl.properties.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
