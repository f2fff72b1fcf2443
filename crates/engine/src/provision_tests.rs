// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn config(key: &str, default: Option<&str>) -> ConfigDecl {
    ConfigDecl { key: key.to_string(), default: default.map(str::to_string), description: None }
}

#[test]
fn config_default_never_overwrites() {
    let p = MemoryProvisioner::new();
    let unit = UnitId::new("report");
    p.set_property("report.limit", "50");

    p.ensure_config_default(&unit, &config("report.limit", Some("10"))).unwrap();
    p.ensure_config_default(&unit, &config("report.title", Some("Daily"))).unwrap();
    p.ensure_config_default(&unit, &config("report.empty", None)).unwrap();

    assert_eq!(p.property("report.limit").as_deref(), Some("50"));
    assert_eq!(p.property("report.title").as_deref(), Some("Daily"));
    assert_eq!(p.property("report.empty").as_deref(), Some(""));
}

#[test]
fn privileges_are_created_once() {
    let p = MemoryProvisioner::new();
    let unit = UnitId::new("report");
    let decl = PrivilegeDecl { name: "View Reports".into(), description: Some("first".into()) };
    p.ensure_privilege(&unit, &decl).unwrap();
    p.ensure_privilege(&unit, &PrivilegeDecl { description: Some("second".into()), ..decl }).unwrap();

    assert!(p.has_privilege("View Reports"));
    assert_eq!(p.privileges(), vec!["View Reports"]);
}

#[test]
fn blank_names_are_rejected() {
    let p = MemoryProvisioner::new();
    let unit = UnitId::new("report");
    assert!(p.ensure_privilege(&unit, &PrivilegeDecl { name: " ".into(), description: None }).is_err());
    assert!(p.ensure_config_default(&unit, &config("", Some("x"))).is_err());
}
