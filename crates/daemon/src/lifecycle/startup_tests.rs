// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mh_core::UnitId;
use mh_engine::test_support::{EventLog, RecordingActivator};
use mh_engine::UnitState;
use mh_manifest::test_support::ArchiveBuilder;
use tempfile::tempdir;

fn test_config(dir: &std::path::Path) -> Config {
    Config::defaults(dir.to_path_buf())
}

fn linked(log: &EventLog) -> Arc<CodeCatalog> {
    let catalog = Arc::new(CodeCatalog::new());
    let log = log.clone();
    catalog.link_activator("base.Activator", move || RecordingActivator::new("base", &log));
    catalog
}

#[tokio::test]
async fn startup_takes_lock_and_starts_units() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.repository_dir).unwrap();
    ArchiveBuilder::new("base", "1.0")
        .activator("base.Activator")
        .symbol("base.Activator")
        .write_to(&config.repository_dir);

    let log = EventLog::new();
    let mut daemon = startup(&config, linked(&log), Arc::new(HostCodebase::new())).unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(config.log_dir.is_dir());
    assert_eq!(daemon.host.manager().state(&UnitId::new("base")), Some(UnitState::Started));
    assert_eq!(log.entries(), vec!["start:base"]);

    daemon.shutdown().await.unwrap();
    assert_eq!(log.entries(), vec!["start:base", "stop:base"]);
    assert!(!config.lock_path.exists());
}

#[test]
fn startup_lock_failed_does_not_remove_pid_file() {
    // Simulate a running daemon by holding the lock. A second startup
    // attempt must fail without deleting its PID file.
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)
        .unwrap();
    lock_file.lock_exclusive().unwrap();
    std::fs::write(&config.lock_path, b"12345").unwrap();

    match startup(&config, Arc::new(CodeCatalog::new()), Arc::new(HostCodebase::new())) {
        Err(LifecycleError::LockFailed(_)) => {}
        Err(e) => panic!("expected LockFailed, got: {e}"),
        Ok(_) => panic!("expected LockFailed, but startup succeeded"),
    }

    assert!(config.lock_path.exists(), "lock file must not be deleted on LockFailed");
    assert_eq!(std::fs::read_to_string(&config.lock_path).unwrap(), "12345");
}

#[test]
fn startup_failure_removes_pid_file() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    // A directory where the job store file should be makes the store unopenable
    std::fs::create_dir_all(config.jobs_path.join("blocked")).unwrap();

    let result = startup(&config, Arc::new(CodeCatalog::new()), Arc::new(HostCodebase::new()));
    assert!(result.is_err());
    assert!(!config.lock_path.exists());
}
