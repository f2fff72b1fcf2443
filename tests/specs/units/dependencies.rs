// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution specs
//!
//! Units that cannot start are excluded before anything runs, and so are
//! the units that depend on them.

use crate::prelude::*;

#[test]
fn missing_dependency_excludes_the_unit_and_its_dependents() {
    let world = World::new();
    world.unit(forms()).unit(reports());

    let report = world.start();
    assert!(report.started.is_empty());
    assert_eq!(world.state("forms"), Some(UnitState::Errored));
    assert_eq!(world.state("reports"), Some(UnitState::Errored));
    assert!(world.startup_error("forms").unwrap().contains("requires unit 'core' which is not installed"));
    assert!(world.startup_error("reports").unwrap().contains("requires unit 'forms' which cannot start"));

    // No activator ran and no job was registered
    assert!(world.log.entries().is_empty());
    assert!(world.host.jobs().unwrap().is_empty());
}

#[test]
fn cycle_is_excluded_while_other_units_start() {
    let world = World::new();
    world
        .unit(core())
        .unit(ArchiveBuilder::new("left", "1.0").requires(&["right"]))
        .unit(ArchiveBuilder::new("right", "1.0").requires(&["left"]));

    let report = world.start();
    assert_eq!(report.started, vec![id("core")]);
    for unit in ["left", "right"] {
        assert_eq!(world.state(unit), Some(UnitState::Errored));
        assert!(world.startup_error(unit).unwrap().contains("dependency cycle"));
    }
}

#[test]
fn version_requirements_gate_startup() {
    let world = World::new();
    world
        .unit(ArchiveBuilder::new("future.host", "1.0").require_host_version("99.0"))
        .unit(ArchiveBuilder::new("future.schema", "1.0").require_schema_version("3.0"))
        .unit(ArchiveBuilder::new("current.schema", "1.0").require_schema_version("2.1"));

    let report = world.start();
    assert_eq!(report.started, vec![id("current.schema")]);
    assert!(world.startup_error("future.host").unwrap().contains("host version 99.0"));
    assert_eq!(world.state("future.schema"), Some(UnitState::Errored));
}

#[test]
fn dependency_code_is_visible_but_not_the_reverse() {
    let world = World::new();
    world.unit(core()).unit(forms());
    world.start();

    let contexts = world.host.manager().contexts();
    let forms_ctx = contexts.get(&id("forms")).unwrap();
    let core_ctx = contexts.get(&id("core")).unwrap();

    assert!(forms_ctx.resolve("core.Activator").is_ok());
    assert!(forms_ctx.resolve(HOST_TASK).is_ok());
    assert!(core_ctx.resolve("forms.Menu").is_err());
}

#[test]
fn dependency_fixed_after_install_starts_on_next_startup() {
    let world = World::with_config(|c| c.allow_admin = true);
    world.unit(forms());
    world.start();
    assert_eq!(world.state("forms"), Some(UnitState::Errored));

    let archive = core();
    world.host.install_unit(&archive.file_name(), &archive.bytes()).unwrap();
    world.host.clear_startup_error(&id("forms")).unwrap();

    let report = world.host.manager().startup();
    assert_eq!(report.started, vec![id("core"), id("forms")]);
}
