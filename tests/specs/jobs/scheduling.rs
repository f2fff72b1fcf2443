// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job scheduling specs
//!
//! Firing times are driven by the fake clock; each `advance` runs whatever
//! fell due.

use crate::prelude::*;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};

#[tokio::test]
async fn one_shot_job_fires_once_then_is_not_running() {
    let world = World::new();
    world.start();
    let job = world.save_job("ping", HOST_TASK, 0);

    assert!(world.host.schedule_job(job).unwrap());
    assert_eq!(world.host.job_status(job).to_string(), "Scheduled to execute at 2026-01-01 00:00:00 UTC");

    assert_eq!(world.advance(0).await, 1);
    assert_eq!(world.host.job_status(job).to_string(), "Not Running");
    assert!(!world.host.job(job).unwrap().unwrap().started);

    assert_eq!(world.advance(3600).await, 0);
    assert_eq!(world.runs("ping"), 1);
}

#[tokio::test]
async fn repeating_job_waits_default_delay_then_runs_every_interval() {
    let world = World::new();
    world.start();
    let job = world.save_job("heartbeat", HOST_TASK, 60);
    world.host.schedule_job(job).unwrap();
    assert_eq!(world.host.job_status(job).to_string(), "Scheduled to execute at 2026-01-01 00:01:00 UTC");

    assert_eq!(world.advance(59).await, 0);
    assert_eq!(world.advance(1).await, 1);
    assert_eq!(world.advance(30).await, 0);
    assert_eq!(world.advance(30).await, 1);
    assert_eq!(world.runs("heartbeat"), 2);
    assert_eq!(world.host.job_status(job).to_string(), "Scheduled to execute at 2026-01-01 00:03:00 UTC");
}

#[tokio::test]
async fn missed_ticks_are_skipped_not_replayed() {
    let world = World::new();
    world.start();
    let job = world.save_job("heartbeat", HOST_TASK, 60);
    world.host.schedule_job(job).unwrap();
    assert_eq!(world.advance(60).await, 1);

    // Four ticks pass unobserved; only one catch-up run happens
    assert_eq!(world.advance(250).await, 1);
    assert_eq!(world.runs("heartbeat"), 2);

    // The next run lands back on the 60 s grid
    assert_eq!(world.advance(49).await, 0);
    assert_eq!(world.advance(1).await, 1);
}

#[tokio::test]
async fn start_time_in_the_future_is_honored() {
    let world = World::new();
    world.start();
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap();
    let mut def =
        JobDefinition::builder().name("hourly").task_class(HOST_TASK).repeat_interval(3600).start_time(start).build();
    world.host.save_job(&mut def).unwrap();
    let job = def.id.unwrap();

    world.host.schedule_job(job).unwrap();
    assert_eq!(world.host.job_status(job).to_string(), "Scheduled to execute at 2026-01-01 01:00:00 UTC");

    assert_eq!(world.advance(3599).await, 0);
    assert_eq!(world.advance(1).await, 1);
    let next = start + ChronoDuration::hours(1);
    assert_eq!(world.host.job_status(job), TaskStatus::Scheduled(next));
}

#[test]
fn scheduling_twice_keeps_one_binding() {
    let world = World::new();
    world.start();
    let job = world.save_job("heartbeat", HOST_TASK, 60);

    assert!(world.host.schedule_job(job).unwrap());
    assert!(world.host.schedule_job(job).unwrap());
    assert_eq!(world.host.scheduled_jobs().len(), 1);
    assert_eq!(world.log.count("shutdown"), 1);
}

#[test]
fn shutting_down_a_job_is_idempotent() {
    let world = World::new();
    world.start();
    let job = world.save_job("heartbeat", HOST_TASK, 60);
    world.host.schedule_job(job).unwrap();

    world.host.shutdown_job(job).unwrap();
    world.host.shutdown_job(job).unwrap();
    assert_eq!(world.host.job_status(job), TaskStatus::NotRunning);
    assert_eq!(world.log.count("shutdown"), 1);
}

#[tokio::test]
async fn unit_job_uses_the_units_code_and_stops_with_it() {
    let world = World::new();
    world.unit(core()).unit(forms()).unit(reports());
    world.start();

    assert_eq!(world.advance(60).await, 1);
    assert_eq!(world.runs("nightly"), 1);

    world.host.stop_unit(&id("forms")).unwrap();
    assert_eq!(world.state("reports"), Some(UnitState::Stopped));
    assert_eq!(world.advance(60).await, 0);
    assert_eq!(world.runs("nightly"), 1);

    // The unit is gone, so its job cannot be bound
    let nightly = world.job_named("nightly").id.unwrap();
    assert!(!world.host.schedule_job(nightly).unwrap());
}

#[test]
fn job_with_unknown_class_is_a_typed_error() {
    let world = World::new();
    world.start();
    let job = world.save_job("ghost", "org.example.Missing", 60);

    let err = world.host.schedule_job(job).unwrap_err();
    assert!(
        matches!(err, LifecycleError::Scheduler(mh_engine::SchedulerError::Resolve { .. })),
        "got {err}"
    );
    assert!(!world.host.job(job).unwrap().unwrap().started);
}
