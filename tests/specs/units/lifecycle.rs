// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit lifecycle specs
//!
//! Start, stop, and failure handling as seen through the host.

use crate::prelude::*;

fn stop_hooks(world: &World) -> Vec<String> {
    world.log.entries().into_iter().filter(|e| e.starts_with("stop:")).collect()
}

#[test]
fn units_start_in_dependency_order_and_stop_in_reverse() {
    let world = World::new();
    world.unit(reports()).unit(forms()).unit(core());

    let report = world.start();
    assert_eq!(report.started, vec![id("core"), id("forms"), id("reports")]);
    assert!(report.failed.is_empty());
    assert_eq!(world.rendered("main.menu"), vec!["forms menu", "reports menu"]);
    assert!(world.host.provisioner().has_privilege("View Reports"));
    assert_eq!(world.host.provisioner().property("reports.limit").as_deref(), Some("25"));

    world.log.clear();
    world.host.manager().shutdown();
    assert_eq!(stop_hooks(&world), vec!["stop:reports", "stop:forms", "stop:core"]);
    assert!(world.host.manager().contexts().is_empty());
}

#[test]
fn stopping_a_unit_leaves_no_extensions_or_bindings() {
    let world = World::new();
    world.unit(core()).unit(forms()).unit(reports());
    world.start();
    let nightly = world.job_named("nightly").id.unwrap();
    assert!(world.host.scheduler().is_scheduled(nightly));

    world.host.stop_unit(&id("reports")).unwrap();

    assert_eq!(world.state("reports"), Some(UnitState::Stopped));
    assert_eq!(world.rendered("main.menu"), vec!["forms menu"]);
    assert!(!world.host.scheduler().is_scheduled(nightly));
    assert_eq!(world.host.job_status(nightly).to_string(), "Not Running");
    assert!(world.host.manager().contexts().get(&id("reports")).is_none());

    // Starting it again registers its handlers without duplicating the job
    world.host.start_unit(&id("reports")).unwrap();
    assert_eq!(world.rendered("main.menu"), vec!["forms menu", "reports menu"]);
    let named: Vec<String> = world.host.jobs().unwrap().into_iter().map(|j| j.name).collect();
    assert_eq!(named, vec!["nightly"]);
}

#[test]
fn failed_start_is_isolated_and_diagnosed() {
    let world = World::new();
    world.unit(core()).unit(broken_billing()).unit(forms());

    let report = world.start();
    assert_eq!(report.started, vec![id("core"), id("forms")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, id("billing"));

    assert_eq!(world.state("billing"), Some(UnitState::Errored));
    let diagnostic = world.startup_error("billing").unwrap();
    assert!(diagnostic.starts_with("Unable to start unit"));
    assert!(diagnostic.lines().any(|l| l.starts_with(" ** ") && l.contains(BROKEN_ACTIVATOR)));
    assert!(diagnostic.contains("billing activator refused to start"));

    // Nothing of billing is left behind
    assert!(world.host.manager().contexts().get(&id("billing")).is_none());
    assert_eq!(world.log.count("stop:billing"), 0);
}

#[test]
fn startup_error_must_be_cleared_before_retry() {
    let world = World::new();
    world.unit(core()).unit(broken_billing());
    world.start();

    let err = world.host.start_unit(&id("billing")).unwrap_err();
    assert!(matches!(err, LifecycleError::Unit(mh_engine::UnitError::StartupErrorPending(_))), "got {err}");

    // Relink a working activator under the same name, then retry
    let log = world.log.clone();
    world.catalog.link_activator(BROKEN_ACTIVATOR, move || RecordingActivator::new("billing", &log));
    world.host.clear_startup_error(&id("billing")).unwrap();
    world.host.start_unit(&id("billing")).unwrap();

    assert_eq!(world.state("billing"), Some(UnitState::Started));
    assert_eq!(world.startup_error("billing"), None);
}

#[test]
fn restart_keeps_the_units_jobs_running() {
    let world = World::new();
    world.unit(core()).unit(forms()).unit(reports());
    world.start();
    let nightly = world.job_named("nightly").id.unwrap();
    world.log.clear();

    world.host.restart_unit(&id("reports")).unwrap();

    let hooks: Vec<String> = world.log.entries().into_iter().filter(|e| e.contains(":reports")).collect();
    assert_eq!(hooks, vec!["stop:reports", "start:reports"]);
    assert!(world.host.scheduler().is_scheduled(nightly));
}

#[test]
fn paths_resolve_to_the_longest_started_unit() {
    let world = World::new();
    world.unit(core()).unit(forms()).unit(ArchiveBuilder::new("forms.entry", "1.0").requires(&["forms"]));
    world.start();

    assert_eq!(world.host.unit_for_path("/forms/entry/css/entry.css").unwrap(), Some(id("forms.entry")));
    assert_eq!(world.host.unit_for_path("/forms/view.htm").unwrap(), Some(id("forms")));
    assert_eq!(world.host.unit_for_path("/billing/index.htm").unwrap(), None);
    assert!(world.host.unit_for_path("forms").is_err());
    assert_eq!(world.host.path_for_resource(&id("forms.entry"), "/forms/entry/css/entry.css"), "/css/entry.css");

    world.host.stop_unit(&id("forms.entry")).unwrap();
    assert_eq!(world.host.unit_for_path("/forms/entry/css/entry.css").unwrap(), Some(id("forms")));
}
