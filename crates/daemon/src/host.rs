// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host facade: wires the code catalog, job store, scheduler, and unit
//! manager together and exposes the operations callers use at runtime.

use std::sync::Arc;

use mh_core::{Clock, FixedActor, JobId, UnitId};
use mh_engine::{
    CodeCatalog, ContextRegistry, ContextTaskFactory, HostCodebase, HostVersions, LoadReport, MemoryProvisioner,
    RegisteredExtension, Scheduler, SchedulerConfig, SchedulerError, StartupReport, TaskStatus, UnitInfo,
    UnitManager, UpdateChecker,
};
use mh_storage::{FileJobStore, JobDefinition};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::lifecycle::{Config, LifecycleError};

pub struct Host<C: Clock> {
    config: Config,
    catalog: Arc<CodeCatalog>,
    codebase: Arc<HostCodebase>,
    provisioner: Arc<MemoryProvisioner>,
    scheduler: Arc<Scheduler<C>>,
    manager: Arc<UnitManager<C>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Clock> Host<C> {
    /// Open the job store and build the scheduler and unit manager. Nothing
    /// is discovered or started until [`Host::startup`].
    pub fn new(
        config: Config,
        catalog: Arc<CodeCatalog>,
        codebase: Arc<HostCodebase>,
        clock: C,
    ) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(&config.state_dir)?;
        let store = Arc::new(FileJobStore::open(config.jobs_path.clone())?);
        let contexts = Arc::new(ContextRegistry::new());
        let factory =
            Arc::new(ContextTaskFactory::new(Arc::clone(&contexts), Arc::clone(&codebase), Arc::clone(&catalog)));
        let scheduler = Arc::new(Scheduler::new(
            store,
            factory,
            Arc::new(FixedActor::new(config.actor.clone())),
            clock,
            SchedulerConfig { default_delay: config.default_delay },
        ));
        let provisioner = Arc::new(MemoryProvisioner::new());
        let versions = HostVersions { host: config.host_version.clone(), schema: config.schema_version.clone() };
        let manager = Arc::new(UnitManager::new(
            contexts,
            Arc::clone(&scheduler),
            provisioner.clone(),
            Arc::clone(&codebase),
            Arc::clone(&catalog),
            versions,
        ));

        Ok(Self { config, catalog, codebase, provisioner, scheduler, manager, timer: Mutex::new(None) })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CodeCatalog> {
        &self.catalog
    }

    pub fn codebase(&self) -> &Arc<HostCodebase> {
        &self.codebase
    }

    pub fn provisioner(&self) -> &Arc<MemoryProvisioner> {
        &self.provisioner
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<C>> {
        &self.scheduler
    }

    pub fn manager(&self) -> &Arc<UnitManager<C>> {
        &self.manager
    }

    /// Load archives (the configured list, or the repository), then start
    /// every startable unit and its start-on-startup jobs.
    pub fn startup(&self) -> Result<StartupReport, LifecycleError> {
        let loaded = self.load_units()?;
        for skipped in &loaded.skipped {
            warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped unit archive");
        }

        let report = self.manager.startup();
        for (id, reason) in &report.failed {
            warn!(unit_id = %id, reason = %reason, "unit did not start");
        }
        info!(
            loaded = loaded.loaded.len(),
            started = report.started.len(),
            jobs = report.jobs_scheduled,
            "host started"
        );
        Ok(report)
    }

    fn load_units(&self) -> Result<LoadReport, LifecycleError> {
        if self.config.unit_list.is_empty() {
            Ok(self.manager.discover(&self.config.repository_dir)?)
        } else {
            Ok(self.manager.discover_paths(&self.config.unit_list))
        }
    }

    /// Spawn the shared timer loop. Must be called from a tokio runtime.
    pub fn spawn_timer(&self) {
        let mut timer = self.timer.lock();
        if timer.is_none() {
            *timer = Some(self.scheduler.spawn());
        }
    }

    /// Run the update sweep as a background task when enabled.
    pub fn spawn_update_check(&self) -> Option<JoinHandle<bool>> {
        if !self.config.check_updates {
            return None;
        }
        let checker = match UpdateChecker::new(self.config.update_timeout) {
            Ok(checker) => checker,
            Err(e) => {
                warn!(error = %e, "update checker unavailable");
                return None;
            }
        };
        let manager = Arc::clone(&self.manager);
        Some(tokio::spawn(async move { manager.check_for_updates(&checker).await }))
    }

    pub async fn check_for_updates(&self) -> Result<bool, LifecycleError> {
        let checker = UpdateChecker::new(self.config.update_timeout)?;
        Ok(self.manager.check_for_updates(&checker).await)
    }

    /// Cancel every job and the timer loop, then stop units in reverse
    /// start order.
    pub async fn shutdown(&self) {
        self.scheduler.on_shutdown();
        self.manager.shutdown();
        let timer = self.timer.lock().take();
        if let Some(handle) = timer {
            if let Err(e) = handle.await {
                warn!(error = %e, "timer loop ended abnormally");
            }
        }
        info!("host stopped");
    }

    /// Restart every unit while keeping active jobs running across the
    /// restart. Jobs that cannot be restored stay in the errored set.
    pub fn refresh(&self) -> StartupReport {
        let snapshot = self.scheduler.save_snapshot();
        self.manager.shutdown();
        let report = self.manager.startup();
        let errored = self.scheduler.restore_snapshot(snapshot);
        for def in &errored {
            warn!(job = %def.label(), "job could not be restored after refresh");
        }
        info!(started = report.started.len(), errored = errored.len(), "refreshed units");
        report
    }

    // -- units --

    pub fn units(&self) -> Vec<UnitInfo> {
        self.manager.list()
    }

    pub fn unit(&self, id: &UnitId) -> Option<UnitInfo> {
        self.manager.get(id)
    }

    pub fn start_unit(&self, id: &UnitId) -> Result<(), LifecycleError> {
        Ok(self.manager.start(id)?)
    }

    pub fn stop_unit(&self, id: &UnitId) -> Result<(), LifecycleError> {
        Ok(self.manager.stop(id, false)?)
    }

    pub fn restart_unit(&self, id: &UnitId) -> Result<(), LifecycleError> {
        Ok(self.manager.restart(id)?)
    }

    pub fn clear_startup_error(&self, id: &UnitId) -> Result<(), LifecycleError> {
        Ok(self.manager.clear_startup_error(id)?)
    }

    pub fn install_unit(&self, file_name: &str, bytes: &[u8]) -> Result<UnitId, LifecycleError> {
        if !self.config.allow_admin {
            return Err(LifecycleError::AdminDisabled);
        }
        Ok(self.manager.install(&self.config.repository_dir, file_name, bytes)?)
    }

    pub fn uninstall_unit(&self, id: &UnitId) -> Result<(), LifecycleError> {
        if !self.config.allow_admin {
            return Err(LifecycleError::AdminDisabled);
        }
        Ok(self.manager.uninstall(id)?)
    }

    /// Unit serving `path`, by longest package-style prefix.
    pub fn unit_for_path(&self, path: &str) -> Result<Option<UnitId>, LifecycleError> {
        Ok(self.manager.unit_for_path(path)?)
    }

    pub fn path_for_resource(&self, unit: &UnitId, path: &str) -> String {
        self.manager.path_for_resource(unit, path)
    }

    // -- extensions --

    pub fn extensions(&self, point: &str) -> Vec<RegisteredExtension> {
        self.manager.extensions().lookup(point)
    }

    pub fn extension_points(&self) -> Vec<String> {
        self.manager.extensions().points()
    }

    // -- jobs --

    pub fn jobs(&self) -> Result<Vec<JobDefinition>, LifecycleError> {
        Ok(self.scheduler.registered_tasks()?)
    }

    pub fn scheduled_jobs(&self) -> Vec<JobDefinition> {
        self.scheduler.scheduled_tasks()
    }

    pub fn job(&self, id: JobId) -> Result<Option<JobDefinition>, LifecycleError> {
        Ok(self.scheduler.task(id)?)
    }

    pub fn save_job(&self, def: &mut JobDefinition) -> Result<JobId, LifecycleError> {
        Ok(self.scheduler.save_task(def)?)
    }

    pub fn delete_job(&self, id: JobId) -> Result<(), LifecycleError> {
        Ok(self.scheduler.delete_task(id)?)
    }

    /// Schedule a persisted job. Returns false when its task is unavailable.
    pub fn schedule_job(&self, id: JobId) -> Result<bool, LifecycleError> {
        let mut def = self.require_job(id)?;
        Ok(self.scheduler.schedule_task(&mut def)?)
    }

    pub fn reschedule_job(&self, id: JobId) -> Result<bool, LifecycleError> {
        let mut def = self.require_job(id)?;
        Ok(self.scheduler.reschedule_task(&mut def)?)
    }

    pub fn shutdown_job(&self, id: JobId) -> Result<(), LifecycleError> {
        let mut def = self.require_job(id)?;
        Ok(self.scheduler.shutdown_task(&mut def)?)
    }

    pub fn job_status(&self, id: JobId) -> TaskStatus {
        self.scheduler.status(id)
    }

    fn require_job(&self, id: JobId) -> Result<JobDefinition, LifecycleError> {
        self.scheduler.task(id)?.ok_or(LifecycleError::Scheduler(SchedulerError::NotFound(id)))
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
