// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler service.
//!
//! Live bindings and the timer queue share one lock. A single timer loop
//! pops due entries and runs job bodies one at a time, outside the lock.
//! Each binding carries a generation; a firing whose binding was cancelled
//! or replaced while it ran is dropped instead of re-armed.

use super::queue::TimerQueue;
use super::trigger;
use crate::catalog::Task;
use crate::context::{Origin, ResolveError};
use crate::factory::{TaskFactory, TaskInstance};
use chrono::{DateTime, Utc};
use mh_core::{ActorSource, Clock, JobId, UnitId};
use mh_storage::{JobDefinition, JobStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Delay before the first firing of a repeating job with no start time.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(60);

/// Upper bound on how long the timer loop sleeps with nothing armed.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to resolve task for job '{job}': {source}")]
    Resolve {
        job: String,
        #[source]
        source: ResolveError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("scheduler has been shut down")]
    ShutDown,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub default_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { default_delay: DEFAULT_DELAY }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Scheduled(DateTime<Utc>),
    Executing,
    NotRunning,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Scheduled(at) => {
                write!(f, "Scheduled to execute at {}", at.format("%Y-%m-%d %H:%M:%S UTC"))
            }
            TaskStatus::Executing => f.write_str("Currently executing"),
            TaskStatus::NotRunning => f.write_str("Not Running"),
        }
    }
}

/// Jobs captured by [`Scheduler::save_snapshot`] for a later restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerSnapshot {
    pub tasks: Vec<JobDefinition>,
    /// Jobs that failed to restore last time; retried on the next restore.
    pub errored: Vec<JobDefinition>,
}

impl SchedulerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.errored.is_empty()
    }
}

struct Binding {
    def: JobDefinition,
    instance: TaskInstance,
    generation: u64,
    executing: bool,
}

impl Binding {
    fn belongs_to(&self, unit: &UnitId) -> bool {
        self.def.owner_unit.as_ref() == Some(unit) || matches!(&self.instance.origin, Origin::Unit(u) if u == unit)
    }
}

#[derive(Default)]
struct Bindings {
    map: HashMap<JobId, Binding>,
    queue: TimerQueue,
    next_generation: u64,
}

struct Firing {
    job: JobId,
    generation: u64,
    scheduled_ms: u64,
    def: JobDefinition,
    task: Arc<dyn Task>,
}

pub struct Scheduler<C: Clock> {
    store: Arc<dyn JobStore>,
    factory: Arc<dyn TaskFactory>,
    actor: Arc<dyn ActorSource>,
    clock: C,
    config: SchedulerConfig,
    bindings: Mutex<Bindings>,
    registered: Mutex<Vec<JobDefinition>>,
    errored: Mutex<Vec<JobDefinition>>,
    wake: Notify,
    cancel: CancellationToken,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        store: Arc<dyn JobStore>,
        factory: Arc<dyn TaskFactory>,
        actor: Arc<dyn ActorSource>,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            factory,
            actor,
            clock,
            config,
            bindings: Mutex::new(Bindings::default()),
            registered: Mutex::new(Vec::new()),
            errored: Mutex::new(Vec::new()),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Bind `def` to a timer, replacing any existing binding for the job.
    ///
    /// Returns `Ok(false)` when the factory has no task for the definition;
    /// no binding is created in that case.
    pub fn schedule_task(&self, def: &mut JobDefinition) -> Result<bool, SchedulerError> {
        if self.is_shut_down() {
            return Err(SchedulerError::ShutDown);
        }
        if let Some(id) = def.id {
            if self.release(id).is_some() {
                tracing::info!(job = %def.label(), "shutting down existing binding before rescheduling");
            }
        }
        let id = match def.id {
            Some(id) => id,
            None => self.save_task(def)?,
        };

        let instance = match self.factory.create_task(def) {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                tracing::warn!(
                    job = %def.label(),
                    task_class = %def.task_class,
                    "no task available, job not scheduled"
                );
                self.persist_unstarted(def);
                return Ok(false);
            }
            Err(source) => {
                self.persist_unstarted(def);
                return Err(SchedulerError::Resolve { job: def.label(), source });
            }
        };

        def.started = true;
        if let Err(e) = self.save_task(def) {
            instance.task.shutdown();
            self.persist_unstarted(def);
            return Err(e);
        }

        let fire_at = trigger::first_fire_ms(def, self.clock.epoch_ms(), self.default_delay_ms());
        let replaced = {
            let mut guard = self.bindings.lock();
            let b = &mut *guard;
            b.next_generation += 1;
            let generation = b.next_generation;
            b.queue.set_timer(id, generation, fire_at);
            b.map.insert(id, Binding { def: def.clone(), instance, generation, executing: false })
        };
        if let Some(old) = replaced {
            old.instance.task.shutdown();
        }
        self.wake.notify_one();
        tracing::info!(job = %def.label(), fire_at = %to_datetime(fire_at), "scheduled job");
        Ok(true)
    }

    /// Record an unbound job as not started. A previous binding may have
    /// left `started = true` in the store.
    fn persist_unstarted(&self, def: &mut JobDefinition) {
        def.started = false;
        if def.id.is_none() {
            return;
        }
        if let Err(e) = self.save_task(def) {
            tracing::warn!(job = %def.label(), error = %e, "failed to persist unstarted job");
        }
    }

    /// Cancel the job's binding (if any) and persist `started = false`.
    pub fn shutdown_task(&self, def: &mut JobDefinition) -> Result<(), SchedulerError> {
        if let Some(id) = def.id {
            if self.release(id).is_some() {
                tracing::info!(job = %def.label(), "shut down job");
            }
        }
        def.started = false;
        if def.id.is_some() {
            self.save_task(def)?;
        }
        Ok(())
    }

    pub fn reschedule_task(&self, def: &mut JobDefinition) -> Result<bool, SchedulerError> {
        self.shutdown_task(def)?;
        self.schedule_task(def)
    }

    /// Reschedule every bound job. Returns how many are bound afterwards.
    pub fn reschedule_all_tasks(&self) -> usize {
        let mut rescheduled = 0;
        for mut def in self.scheduled_tasks() {
            match self.reschedule_task(&mut def) {
                Ok(true) => rescheduled += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(job = %def.label(), error = %e, "failed to reschedule job"),
            }
        }
        rescheduled
    }

    /// Schedule persisted start-on-startup jobs that are not bound yet.
    pub fn on_startup(&self) -> usize {
        let defs = match self.store.tasks() {
            Ok(defs) => defs,
            Err(e) => {
                tracing::error!(error = %e, "failed to load jobs on startup");
                return 0;
            }
        };
        let mut scheduled = 0;
        for mut def in defs.into_iter().filter(|d| d.start_on_startup) {
            if def.id.is_some_and(|id| self.is_scheduled(id)) {
                continue;
            }
            match self.schedule_task(&mut def) {
                Ok(true) => scheduled += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(job = %def.label(), error = %e, "failed to schedule job on startup"),
            }
        }
        tracing::info!(scheduled, "scheduled start-on-startup jobs");
        scheduled
    }

    pub fn shutdown_all_tasks(&self) {
        for mut def in self.scheduled_tasks() {
            if let Err(e) = self.shutdown_task(&mut def) {
                tracing::warn!(job = %def.label(), error = %e, "failed to shut down job");
            }
        }
    }

    /// Shut down every job and stop the timer loop. Scheduling afterwards fails.
    pub fn on_shutdown(&self) {
        self.shutdown_all_tasks();
        self.cancel.cancel();
        self.bindings.lock().queue.clear();
        tracing::info!("scheduler shut down");
    }

    /// Shut down jobs owned by `unit` or whose code came from it.
    /// Returns the definitions as they were while bound.
    pub fn shutdown_unit_tasks(&self, unit: &UnitId) -> Vec<JobDefinition> {
        let active = self.unit_tasks(unit);
        for def in &active {
            if let Err(e) = self.shutdown_task(&mut def.clone()) {
                tracing::warn!(job = %def.label(), unit_id = %unit, error = %e, "failed to shut down job");
            }
        }
        active
    }

    /// Bound jobs tied to `unit`, ordered by id.
    pub fn unit_tasks(&self, unit: &UnitId) -> Vec<JobDefinition> {
        let mut defs: Vec<JobDefinition> = {
            let b = self.bindings.lock();
            b.map.values().filter(|x| x.belongs_to(unit)).map(|x| x.def.clone()).collect()
        };
        defs.sort_by_key(|d| d.id);
        defs
    }

    pub fn status(&self, id: JobId) -> TaskStatus {
        let b = self.bindings.lock();
        match b.map.get(&id) {
            None => TaskStatus::NotRunning,
            Some(binding) if binding.executing => TaskStatus::Executing,
            Some(_) => match b.queue.scheduled_at(id) {
                Some(at) => TaskStatus::Scheduled(to_datetime(at)),
                None => TaskStatus::Executing,
            },
        }
    }

    pub fn is_scheduled(&self, id: JobId) -> bool {
        self.bindings.lock().map.contains_key(&id)
    }

    /// Bound jobs ordered by id, refreshed from the store where possible.
    pub fn scheduled_tasks(&self) -> Vec<JobDefinition> {
        let mut defs: Vec<JobDefinition> = self.bindings.lock().map.values().map(|b| b.def.clone()).collect();
        defs.sort_by_key(|d| d.id);
        defs.into_iter()
            .map(|def| match def.id.map(|id| self.store.task(id)) {
                Some(Ok(Some(fresh))) => fresh,
                _ => def,
            })
            .collect()
    }

    /// Stop every bound job, capturing it along with jobs that failed the
    /// previous restore.
    pub fn save_snapshot(&self) -> SchedulerSnapshot {
        let tasks = self.scheduled_tasks();
        for def in &tasks {
            if let Err(e) = self.shutdown_task(&mut def.clone()) {
                tracing::warn!(job = %def.label(), error = %e, "failed to shut down job for snapshot");
            }
        }
        let errored = std::mem::take(&mut *self.errored.lock());
        tracing::info!(tasks = tasks.len(), errored = errored.len(), "saved scheduler snapshot");
        SchedulerSnapshot { tasks, errored }
    }

    /// Schedule every captured job. Jobs that fail (or resolve to nothing)
    /// are kept in the errored set. Returns the errored jobs.
    pub fn restore_snapshot(&self, snapshot: SchedulerSnapshot) -> Vec<JobDefinition> {
        let mut errored = Vec::new();
        for mut def in snapshot.tasks.into_iter().chain(snapshot.errored) {
            match self.schedule_task(&mut def) {
                Ok(true) => {}
                Ok(false) => errored.push(def),
                Err(e) => {
                    tracing::warn!(job = %def.label(), error = %e, "failed to restore job");
                    errored.push(def);
                }
            }
        }
        if !errored.is_empty() {
            tracing::warn!(errored = errored.len(), "some jobs could not be restored");
        }
        *self.errored.lock() = errored.clone();
        errored
    }

    pub fn errored_tasks(&self) -> Vec<JobDefinition> {
        self.errored.lock().clone()
    }

    /// Remember a definition without persisting it. Replaces an earlier
    /// registration with the same name.
    pub fn register_task(&self, def: JobDefinition) {
        let mut registered = self.registered.lock();
        registered.retain(|d| d.name != def.name);
        registered.push(def);
    }

    /// Persisted jobs plus registered ones not persisted under that name.
    pub fn registered_tasks(&self) -> Result<Vec<JobDefinition>, SchedulerError> {
        let mut tasks = self.store.tasks()?;
        let extra: Vec<JobDefinition> = self
            .registered
            .lock()
            .iter()
            .filter(|r| !tasks.iter().any(|t| t.name == r.name))
            .cloned()
            .collect();
        tasks.extend(extra);
        Ok(tasks)
    }

    pub fn task(&self, id: JobId) -> Result<Option<JobDefinition>, SchedulerError> {
        Ok(self.store.task(id)?)
    }

    pub fn task_by_name(&self, name: &str) -> Result<Option<JobDefinition>, SchedulerError> {
        Ok(self.store.task_by_name(name)?)
    }

    /// Persist `def`, stamping audit fields. Creation fields are only set
    /// when absent; change fields are always refreshed.
    pub fn save_task(&self, def: &mut JobDefinition) -> Result<JobId, SchedulerError> {
        let actor = self.actor.current_actor();
        let now = to_datetime(self.clock.epoch_ms());
        def.changed_by = actor.clone();
        def.date_changed = Some(now);
        match def.id {
            Some(id) => {
                self.store.update(def)?;
                Ok(id)
            }
            None => {
                if def.created_by.is_none() {
                    def.created_by = actor;
                }
                if def.date_created.is_none() {
                    def.date_created = Some(now);
                }
                let id = self.store.create(def)?;
                tracing::debug!(job = %def.label(), "created job definition");
                Ok(id)
            }
        }
    }

    /// Shut the job down if it is running, then delete it from the store.
    pub fn delete_task(&self, id: JobId) -> Result<(), SchedulerError> {
        let Some(mut def) = self.store.task(id)? else {
            return Err(SchedulerError::NotFound(id));
        };
        if def.started || self.is_scheduled(id) {
            self.shutdown_task(&mut def)?;
        }
        self.store.delete(id)?;
        tracing::info!(job = %def.label(), "deleted job");
        Ok(())
    }

    /// Run every job due now, one at a time. Returns how many ran.
    pub async fn tick(&self) -> usize {
        let mut fired = 0;
        while let Some(firing) = self.take_due(self.clock.epoch_ms()) {
            tracing::debug!(job = %firing.def.label(), "firing job");
            if let Err(e) = firing.task.execute(&firing.def).await {
                tracing::warn!(job = %firing.def.label(), error = %e, "job execution failed");
            }
            self.finish(firing);
            fired += 1;
        }
        fired
    }

    /// How long the timer loop may sleep before the next deadline.
    pub fn next_wait(&self) -> Duration {
        let deadline = self.bindings.lock().queue.next_deadline();
        match deadline {
            Some(at) => Duration::from_millis(at.saturating_sub(self.clock.epoch_ms())),
            None => IDLE_WAIT,
        }
    }

    /// The shared timer loop. Exits when [`Self::on_shutdown`] is called.
    pub async fn run(self: Arc<Self>) {
        tracing::info!("scheduler timer loop started");
        loop {
            let wait = self.next_wait();
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(wait) => {
                    self.tick().await;
                }
            }
        }
        tracing::info!("scheduler timer loop stopped");
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    fn default_delay_ms(&self) -> u64 {
        u64::try_from(self.config.default_delay.as_millis()).unwrap_or(u64::MAX)
    }

    /// Remove the binding and cancel its timer, then release the task.
    fn release(&self, id: JobId) -> Option<JobDefinition> {
        let removed = {
            let mut b = self.bindings.lock();
            b.queue.cancel_timer(id);
            b.map.remove(&id)
        }?;
        removed.instance.task.shutdown();
        Some(removed.def)
    }

    fn take_due(&self, now_ms: u64) -> Option<Firing> {
        let mut guard = self.bindings.lock();
        let b = &mut *guard;
        while let Some(entry) = b.queue.pop_due(now_ms) {
            let Some(binding) = b.map.get_mut(&entry.job) else {
                continue;
            };
            if binding.generation != entry.generation {
                continue;
            }
            binding.executing = true;
            return Some(Firing {
                job: entry.job,
                generation: entry.generation,
                scheduled_ms: entry.fire_at_ms,
                def: binding.def.clone(),
                task: Arc::clone(&binding.instance.task),
            });
        }
        None
    }

    /// Re-arm a repeating job or retire a finished one-shot. Bindings that
    /// were cancelled or replaced while the job ran are left alone.
    fn finish(&self, firing: Firing) {
        let interval = trigger::interval_ms(&firing.def);
        let mut guard = self.bindings.lock();
        let b = &mut *guard;
        match b.map.get_mut(&firing.job) {
            Some(binding) if binding.generation == firing.generation => {
                if interval > 0 {
                    binding.executing = false;
                    let next = trigger::following_fire_ms(firing.scheduled_ms, interval, self.clock.epoch_ms());
                    b.queue.set_timer(firing.job, firing.generation, next);
                    return;
                }
            }
            _ => return,
        }

        let retired = b.map.remove(&firing.job);
        drop(guard);
        let Some(binding) = retired else {
            return;
        };
        binding.instance.task.shutdown();
        let mut def = match self.store.task(firing.job) {
            Ok(Some(def)) => def,
            _ => binding.def,
        };
        def.started = false;
        if let Err(e) = self.save_task(&mut def) {
            tracing::warn!(job = %def.label(), error = %e, "failed to persist finished job");
        }
        tracing::debug!(job = %def.label(), "one-shot job finished");
    }
}

impl<C: Clock> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bindings.lock();
        f.debug_struct("Scheduler")
            .field("bindings", &b.map.len())
            .field("armed", &b.queue.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(i64::try_from(ms).unwrap_or(i64::MAX)).unwrap_or_default()
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
