//! Exercises `pulse_server::start` itself: config resolution from a
//! real project file, snapshot rehydration against an empty database
//! path, and every long-lived task spawning and then draining cleanly.
//! `crates/server/tests/http_api.rs` builds `AppState` by hand to keep
//! the HTTP-surface tests fast and process-independent; this is the one
//! place the actual composition root runs end to end.

use serial_test::serial;
use std::io::Write;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn start_wires_every_component_and_drains_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut pulse_toml = std::fs::File::create(dir.path().join("pulse.toml")).expect("create pulse.toml");
    writeln!(
        pulse_toml,
        r#"
[server]
port = 0

[database]
path = "state.db"

[pulse]
workers = 2
tick_interval_ms = 25
"#
    )
    .expect("write pulse.toml");
    drop(pulse_toml);

    let original_dir = std::env::current_dir().expect("cwd");
    std::env::set_current_dir(dir.path()).expect("chdir into tempdir");
    let node = pulse_server::start().await;
    std::env::set_current_dir(&original_dir).expect("restore cwd");

    let node = node.expect("composition root must start with no plugins configured");

    assert_eq!(node.state.config_snapshot().pulse.workers, 2);
    assert_eq!(node.state.active_jobs(), 0);
    assert!(node.state.plugins.list().is_empty());

    let job = node
        .state
        .scheduler
        .create_scheduled("ix webhook", 3600, None)
        .expect("create a scheduled job against the live composition root");
    assert_eq!(job.state, pulse_core::ScheduledJobState::Active);

    pulse_server::shutdown::drain(node.state.shutdown.clone(), &node.state, node.handles, Duration::from_secs(5)).await;
}
