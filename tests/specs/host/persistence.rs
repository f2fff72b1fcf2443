// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host restart specs
//!
//! Job definitions and installed archives outlive the host process.

use crate::prelude::*;

#[tokio::test]
async fn declared_jobs_survive_restart_without_duplicates() {
    let world = World::new();
    world.unit(core()).unit(forms()).unit(reports());
    world.start();
    let nightly = world.job_named("nightly");
    assert_eq!(nightly.owner_unit, Some(id("reports")));
    assert_eq!(nightly.created_by.as_deref(), Some(mh_daemon::lifecycle::DEFAULT_ACTOR));
    world.host.shutdown().await;
    assert!(!world.job_named("nightly").started);

    let reopened = world.reopen();
    reopened.start();
    let jobs = reopened.host.jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, nightly.id);
    assert!(reopened.host.scheduler().is_scheduled(nightly.id.unwrap()));
}

#[tokio::test]
async fn manually_scheduled_jobs_do_not_restart_on_their_own() {
    let world = World::new();
    world.start();
    let ping = world.save_job("ping", HOST_TASK, 60);
    world.host.schedule_job(ping).unwrap();
    world.host.shutdown().await;

    let reopened = world.reopen();
    reopened.start();
    assert!(reopened.host.job(ping).unwrap().is_some());
    assert!(!reopened.host.scheduler().is_scheduled(ping));
}

#[tokio::test]
async fn installed_unit_is_discovered_after_restart() {
    let world = World::with_config(|c| c.allow_admin = true);
    world.start();
    let archive = core();
    world.host.install_unit(&archive.file_name(), &archive.bytes()).unwrap();
    assert_eq!(world.state("core"), Some(UnitState::Discovered));
    world.host.shutdown().await;

    let reopened = world.reopen();
    let report = reopened.start();
    assert_eq!(report.started, vec![id("core")]);
}

#[tokio::test]
async fn scheduling_after_shutdown_is_refused() {
    let world = World::new();
    world.start();
    let ping = world.save_job("ping", HOST_TASK, 0);
    world.host.shutdown().await;

    let err = world.host.schedule_job(ping).unwrap_err();
    assert!(matches!(err, LifecycleError::Scheduler(mh_engine::SchedulerError::ShutDown)), "got {err}");
}
