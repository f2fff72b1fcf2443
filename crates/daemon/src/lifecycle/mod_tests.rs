// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

const ENV_KEYS: &[&str] = &[
    "MH_REPOSITORY_DIR",
    "MH_UNIT_LIST",
    "MH_DEFAULT_DELAY_MS",
    "MH_UPDATE_TIMEOUT_MS",
    "MH_CHECK_UPDATES",
    "MH_ALLOW_ADMIN",
    "MH_ACTOR",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn defaults_derive_paths_from_state_dir() {
    clear_env();
    let dir = tempdir().unwrap();
    let config = Config::at(dir.path().to_path_buf()).unwrap();

    assert_eq!(config.repository_dir, dir.path().join("units"));
    assert_eq!(config.jobs_path, dir.path().join("jobs.json"));
    assert_eq!(config.lock_path, dir.path().join("mhd.pid"));
    assert_eq!(config.log_dir, dir.path().join("logs"));
    assert!(config.unit_list.is_empty());
    assert_eq!(config.host_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(config.schema_version, None);
    assert_eq!(config.default_delay, DEFAULT_DELAY);
    assert!(config.check_updates);
    assert!(!config.allow_admin);
    assert_eq!(config.actor, DEFAULT_ACTOR);
}

#[test]
#[serial]
fn host_file_overlays_defaults() {
    clear_env();
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join(HOST_FILE),
        r#"
repository = "modules"
schema_version = "2.4"
default_delay_ms = 5000
check_updates = false
allow_admin = true
"#,
    )
    .unwrap();

    let config = Config::at(dir.path().to_path_buf()).unwrap();
    assert_eq!(config.repository_dir, dir.path().join("modules"));
    assert_eq!(config.schema_version.as_deref(), Some("2.4"));
    assert_eq!(config.default_delay, Duration::from_secs(5));
    assert!(!config.check_updates);
    assert!(config.allow_admin);
}

#[test]
#[serial]
fn environment_wins_over_host_file() {
    clear_env();
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(HOST_FILE), "allow_admin = true\ndefault_delay_ms = 5000\n").unwrap();
    std::env::set_var("MH_ALLOW_ADMIN", "0");
    std::env::set_var("MH_DEFAULT_DELAY_MS", "250");
    std::env::set_var("MH_UNIT_LIST", "/units/a.unit /units/b.unit");
    std::env::set_var("MH_ACTOR", "ops");

    let config = Config::at(dir.path().to_path_buf()).unwrap();
    clear_env();

    assert!(!config.allow_admin);
    assert_eq!(config.default_delay, Duration::from_millis(250));
    assert_eq!(config.unit_list.len(), 2);
    assert_eq!(config.actor, "ops");
}

#[test]
#[serial]
fn unknown_host_file_key_is_rejected() {
    clear_env();
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(HOST_FILE), "colour = \"blue\"\n").unwrap();

    let err = Config::at(dir.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, LifecycleError::Config { .. }), "got {err}");
    assert!(err.to_string().contains(HOST_FILE));
}
