// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world for host specs.

pub use mh_core::{FakeClock, JobId, UnitId};
pub use mh_daemon::{Config, Host, LifecycleError};
pub use mh_engine::test_support::{EventLog, RecordingActivator, RecordingTask, StaticExtension};
pub use mh_engine::{CodeCatalog, HostCodebase, StartupReport, TaskStatus, UnitState};
pub use mh_manifest::test_support::ArchiveBuilder;
pub use mh_storage::JobDefinition;
pub use std::time::Duration;

use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Units with a recording activator linked as `<unit>.Activator`
const ACTIVATED_UNITS: &[&str] = &["core", "forms", "reports", "billing"];

/// Task class provided by the host code base rather than a unit
pub const HOST_TASK: &str = "host.Heartbeat";

/// Activator of `billing` that always fails to start
pub const BROKEN_ACTIVATOR: &str = "org.example.billing.Broken";

/// A host over a temporary state directory with a standard code catalog.
pub struct World {
    dir: Arc<TempDir>,
    tweak: fn(&mut Config),
    pub log: EventLog,
    pub clock: FakeClock,
    pub catalog: Arc<CodeCatalog>,
    pub host: Host<FakeClock>,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: fn(&mut Config)) -> Self {
        let dir = Arc::new(TempDir::new().unwrap());
        Self::build(dir, tweak, EventLog::new(), FakeClock::new())
    }

    fn build(dir: Arc<TempDir>, tweak: fn(&mut Config), log: EventLog, clock: FakeClock) -> Self {
        let mut config = Config::defaults(dir.path().to_path_buf());
        config.check_updates = false;
        config.schema_version = Some("2.4".into());
        tweak(&mut config);
        std::fs::create_dir_all(&config.repository_dir).unwrap();

        let catalog = Arc::new(standard_catalog(&log));
        let codebase = Arc::new(HostCodebase::new());
        codebase.add_symbol(HOST_TASK);

        let host = Host::new(config, Arc::clone(&catalog), codebase, clock.clone()).unwrap();
        Self { dir, tweak, log, clock, catalog, host }
    }

    /// A fresh host over the same state directory, as after a process
    /// restart. The clock and event log carry over.
    pub fn reopen(&self) -> World {
        Self::build(Arc::clone(&self.dir), self.tweak, self.log.clone(), self.clock.clone())
    }

    /// Write a unit archive into the repository.
    pub fn unit(&self, builder: ArchiveBuilder) -> &Self {
        builder.write_to(&self.host.config().repository_dir);
        self
    }

    pub fn start(&self) -> StartupReport {
        self.host.startup().unwrap()
    }

    pub fn state(&self, unit: &str) -> Option<UnitState> {
        self.host.manager().state(&id(unit))
    }

    pub fn startup_error(&self, unit: &str) -> Option<String> {
        self.host.unit(&id(unit))?.descriptor.startup_error().map(str::to_string)
    }

    /// Rendered content of every handler registered at `point`.
    pub fn rendered(&self, point: &str) -> Vec<String> {
        self.host.extensions(point).iter().filter_map(|e| e.handler.content(&BTreeMap::new())).collect()
    }

    /// Move the clock forward and run whatever fell due.
    pub async fn advance(&self, secs: u64) -> usize {
        self.clock.advance(Duration::from_secs(secs));
        self.host.scheduler().tick().await
    }

    /// Persist a job and return its id.
    pub fn save_job(&self, name: &str, class: &str, interval: u64) -> JobId {
        let mut def = JobDefinition::builder().name(name).task_class(class).repeat_interval(interval).build();
        self.host.save_job(&mut def).unwrap()
    }

    pub fn job_named(&self, name: &str) -> JobDefinition {
        self.host.scheduler().task_by_name(name).unwrap().unwrap()
    }

    pub fn runs(&self, job: &str) -> usize {
        self.log.count(&format!("run:{job}"))
    }
}

fn standard_catalog(log: &EventLog) -> CodeCatalog {
    let catalog = CodeCatalog::new();
    for &unit in ACTIVATED_UNITS {
        let log = log.clone();
        catalog.link_activator(format!("{unit}.Activator"), move || RecordingActivator::new(unit, &log));
    }
    let broken = log.clone();
    catalog.link_activator(BROKEN_ACTIVATOR, move || RecordingActivator::new("billing", &broken).failing_start());
    catalog.link_extension("forms.Menu", || StaticExtension("forms menu".into()));
    catalog.link_extension("reports.Menu", || StaticExtension("reports menu".into()));
    for task in ["reports.Nightly", "forms.Cleanup", HOST_TASK] {
        let log = log.clone();
        catalog.link_task(task, move || RecordingTask::new(&log));
    }
    catalog
}

pub fn id(s: &str) -> UnitId {
    UnitId::new(s)
}

/// `core`: no dependencies
pub fn core() -> ArchiveBuilder {
    ArchiveBuilder::new("core", "1.0").activator("core.Activator").symbol("core.Activator")
}

/// `forms`: depends on core, contributes a menu entry and a cleanup task
pub fn forms() -> ArchiveBuilder {
    ArchiveBuilder::new("forms", "1.1")
        .requires(&["core"])
        .activator("forms.Activator")
        .symbol("forms.Activator")
        .extension("main.menu", "forms.Menu")
        .symbol("forms.Menu")
        .symbol("forms.Cleanup")
}

/// `reports`: depends on forms, declares a nightly start-on-startup job
pub fn reports() -> ArchiveBuilder {
    ArchiveBuilder::new("reports", "2.0")
        .package("org.example.reports")
        .requires(&["forms"])
        .activator("reports.Activator")
        .symbol("reports.Activator")
        .extension("main.menu", "reports.Menu")
        .symbol("reports.Menu")
        .job("nightly", "reports.Nightly", 60, true)
        .symbol("reports.Nightly")
        .privilege("View Reports")
        .config("reports.limit", "25")
}

/// `billing`: depends on core; its activator refuses to start
pub fn broken_billing() -> ArchiveBuilder {
    ArchiveBuilder::new("billing", "1.0")
        .package("org.example.billing")
        .requires(&["core"])
        .activator(BROKEN_ACTIVATOR)
        .symbol(BROKEN_ACTIVATOR)
}
