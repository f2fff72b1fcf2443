// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh specs
//!
//! A refresh restarts every unit and brings back the jobs that were
//! running, keeping the ones that cannot be restored for the next attempt.

use crate::prelude::*;

#[tokio::test]
async fn refresh_restores_running_jobs() {
    let world = World::new();
    world.unit(core()).unit(forms()).unit(reports());
    world.start();
    let cleanup = world.save_job("cleanup", "forms.Cleanup", 60);
    world.host.schedule_job(cleanup).unwrap();
    let nightly = world.job_named("nightly").id.unwrap();

    let report = world.host.refresh();
    assert_eq!(report.started, vec![id("core"), id("forms"), id("reports")]);
    assert!(world.host.scheduler().is_scheduled(cleanup));
    assert!(world.host.scheduler().is_scheduled(nightly));
    assert!(world.host.scheduler().errored_tasks().is_empty());

    assert_eq!(world.advance(60).await, 2);
    assert_eq!(world.runs("cleanup"), 1);
    assert_eq!(world.runs("nightly"), 1);
}

#[test]
fn unrestorable_job_is_retained_and_retried() {
    let world = World::new();
    world.unit(core()).unit(forms());
    world.start();
    let cleanup = world.save_job("cleanup", "forms.Cleanup", 60);
    world.host.schedule_job(cleanup).unwrap();

    // The unit still ships the symbol but the code is no longer linked
    assert!(world.catalog.unlink("forms.Cleanup"));
    world.host.refresh();
    assert!(!world.host.scheduler().is_scheduled(cleanup));
    let errored: Vec<String> = world.host.scheduler().errored_tasks().into_iter().map(|j| j.name).collect();
    assert_eq!(errored, vec!["cleanup"]);

    // Still unlinked: the job stays errored across another refresh
    world.host.refresh();
    assert_eq!(world.host.scheduler().errored_tasks().len(), 1);

    let log = world.log.clone();
    world.catalog.link_task("forms.Cleanup", move || RecordingTask::new(&log));
    world.host.refresh();
    assert!(world.host.scheduler().is_scheduled(cleanup));
    assert!(world.host.scheduler().errored_tasks().is_empty());
}

#[test]
fn stopped_jobs_stay_stopped_after_refresh() {
    let world = World::new();
    world.unit(core()).unit(forms());
    world.start();
    let cleanup = world.save_job("cleanup", "forms.Cleanup", 60);
    world.host.schedule_job(cleanup).unwrap();
    world.host.shutdown_job(cleanup).unwrap();

    world.host.refresh();
    assert!(!world.host.scheduler().is_scheduled(cleanup));
    assert_eq!(world.host.job_status(cleanup), TaskStatus::NotRunning);
}
