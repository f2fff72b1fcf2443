// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn builder_applies_defaults_and_overrides() {
    let def = JobDefinition::builder()
        .name("Purge Sessions")
        .repeat_interval(60)
        .owner_unit("ui")
        .id(7u64)
        .build();
    assert_eq!(def.name, "Purge Sessions");
    assert_eq!(def.task_class, "test.Task");
    assert_eq!(def.repeat_interval, 60);
    assert_eq!(def.owner_unit, Some(UnitId::new("ui")));
    assert_eq!(def.id, Some(JobId(7)));
    assert!(!def.started);
    assert!(def.created_by.is_none());
}

#[yare::parameterized(
    zero_is_one_shot = { 0, true },
    repeating        = { 60, false },
)]
fn one_shot(interval: u64, expected: bool) {
    let def = JobDefinition::builder().repeat_interval(interval).build();
    assert_eq!(def.is_one_shot(), expected);
}

#[test]
fn label_includes_id_when_assigned() {
    let mut def = JobDefinition::new("Tick", "a.Tick");
    assert_eq!(def.label(), "Tick");
    def.id = Some(JobId(3));
    assert_eq!(def.label(), "Tick#3");
}

#[test]
fn deserializes_with_missing_optional_fields() {
    let def: JobDefinition =
        serde_json::from_str(r#"{"name":"Tick","task_class":"a.Tick"}"#).unwrap();
    assert_eq!(def, JobDefinition::new("Tick", "a.Tick"));
}

#[test]
fn property_lookup() {
    let mut props = BTreeMap::new();
    props.insert("batch".to_string(), "100".to_string());
    let def = JobDefinition::builder().properties(props).build();
    assert_eq!(def.property("batch"), Some("100"));
    assert_eq!(def.property("missing"), None);
}
