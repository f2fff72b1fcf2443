// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn job(name: &str) -> JobDefinition {
    JobDefinition::builder().name(name).build()
}

#[test]
fn create_assigns_increasing_ids() {
    let store = MemoryJobStore::new();
    let mut a = job("a");
    let mut b = job("b");
    let id_a = store.create(&mut a).unwrap();
    let id_b = store.create(&mut b).unwrap();
    assert_eq!(a.id, Some(id_a));
    assert!(id_b > id_a);
    assert_eq!(store.tasks().unwrap().len(), 2);
}

#[test]
fn ids_are_not_reused_after_delete() {
    let store = MemoryJobStore::new();
    let mut a = job("a");
    let id_a = store.create(&mut a).unwrap();
    store.delete(id_a).unwrap();
    let mut b = job("b");
    let id_b = store.create(&mut b).unwrap();
    assert_ne!(id_a, id_b);
}

#[test]
fn create_rejects_duplicate_name() {
    let store = MemoryJobStore::new();
    store.create(&mut job("a")).unwrap();
    let err = store.create(&mut job("a")).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateName(name) if name == "a"));
}

#[test]
fn lookup_by_id_and_name() {
    let store = MemoryJobStore::new();
    let mut a = job("a");
    let id = store.create(&mut a).unwrap();
    assert_eq!(store.task(id).unwrap().map(|t| t.name), Some("a".to_string()));
    assert_eq!(store.task_by_name("a").unwrap().and_then(|t| t.id), Some(id));
    assert!(store.task_by_name("zzz").unwrap().is_none());
    assert!(store.task(JobId(999)).unwrap().is_none());
}

#[test]
fn update_replaces_definition() {
    let store = MemoryJobStore::new();
    let mut a = job("a");
    let id = store.create(&mut a).unwrap();
    a.started = true;
    store.update(&a).unwrap();
    assert!(store.task(id).unwrap().is_some_and(|t| t.started));
}

#[yare::parameterized(
    unsaved = { None },
    unknown = { Some(JobId(42)) },
)]
fn update_requires_existing_row(id: Option<JobId>) {
    let store = MemoryJobStore::new();
    let mut def = job("a");
    def.id = id;
    assert!(store.update(&def).is_err());
}

#[test]
fn update_rejects_rename_onto_existing_name() {
    let store = MemoryJobStore::new();
    store.create(&mut job("a")).unwrap();
    let mut b = job("b");
    store.create(&mut b).unwrap();
    b.name = "a".to_string();
    assert!(matches!(store.update(&b), Err(StoreError::DuplicateName(_))));
}

#[test]
fn delete_unknown_is_not_found() {
    let store = MemoryJobStore::new();
    assert!(matches!(store.delete(JobId(1)), Err(StoreError::NotFound(_))));
}
