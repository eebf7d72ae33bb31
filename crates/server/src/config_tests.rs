// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::io::Write;

/// `serial` guards every test in this module: they all mutate process
/// env vars and/or the current directory, both global process state.
#[test]
#[serial]
fn defaults_resolve_with_no_files_or_env() {
    let cfg = load().expect("defaults alone must resolve");
    assert_eq!(cfg.server.port, NodeConfig::default().server.port);
    assert_eq!(cfg.pulse.workers, 4);
}

#[test]
#[serial]
fn env_override_wins_over_defaults() {
    std::env::set_var("PULSE_PULSE__WORKERS", "9");
    std::env::set_var("PULSE_SERVER__PORT", "9999");
    let cfg = load();
    std::env::remove_var("PULSE_PULSE__WORKERS");
    std::env::remove_var("PULSE_SERVER__PORT");

    let cfg = cfg.expect("env-overridden config must still resolve");
    assert_eq!(cfg.pulse.workers, 9);
    assert_eq!(cfg.server.port, 9999);
}

#[test]
#[serial]
fn project_file_is_picked_up_from_the_current_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut file = std::fs::File::create(dir.path().join(PROJECT_CONFIG_FILE)).expect("create pulse.toml");
    writeln!(file, "[pulse]\nmax_retries = 7\n").expect("write pulse.toml");
    drop(file);

    let original = std::env::current_dir().expect("cwd");
    std::env::set_current_dir(dir.path()).expect("chdir into tempdir");
    let cfg = load();
    std::env::set_current_dir(original).expect("restore cwd");

    assert_eq!(cfg.expect("project file must resolve").pulse.max_retries, 7);
}

#[test]
#[serial]
fn env_overrides_project_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut file = std::fs::File::create(dir.path().join(PROJECT_CONFIG_FILE)).expect("create pulse.toml");
    writeln!(file, "[pulse]\nmax_retries = 7\n").expect("write pulse.toml");
    drop(file);

    std::env::set_var("PULSE_PULSE__MAX_RETRIES", "2");
    let original = std::env::current_dir().expect("cwd");
    std::env::set_current_dir(dir.path()).expect("chdir into tempdir");
    let cfg = load();
    std::env::set_current_dir(original).expect("restore cwd");
    std::env::remove_var("PULSE_PULSE__MAX_RETRIES");

    assert_eq!(cfg.expect("config must resolve").pulse.max_retries, 2);
}
