// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::{NullSink, PluginLaunchConfig, PluginName};
use pulse_wire::{CommandResult, HealthCheck};
use std::collections::BTreeMap;
use tokio::net::TcpListener;

/// A minimal fake plugin: replies `Metadata`/`Commands` on launch and
/// `Health` with a scripted sequence of healthy/unhealthy probes.
async fn fake_plugin(mut health_sequence: Vec<bool>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    health_sequence.reverse();
    tokio::spawn(async move {
        let mut health_sequence = health_sequence;
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let Ok(raw) = pulse_wire::read_message(&mut stream).await else { continue };
            let Ok(call) = serde_json::from_slice::<PluginCall>(&raw) else { continue };
            let reply = match call {
                PluginCall::Metadata => PluginReply::Metadata {
                    name: "fake".into(),
                    version: "1.0.0".into(),
                    core_version_constraint: "*".into(),
                    description: "fake plugin".into(),
                },
                PluginCall::Commands => PluginReply::Commands { commands: vec![] },
                PluginCall::Health => {
                    let healthy = health_sequence.pop().unwrap_or(true);
                    PluginReply::Health(HealthCheck { healthy, message: None, details: BTreeMap::new() })
                }
                PluginCall::ExecuteCommand(_) => {
                    PluginReply::ExecuteCommand(CommandResult { stdout: "ok".into(), stderr: String::new(), exit_code: 0 })
                }
                PluginCall::Shutdown { .. } => PluginReply::Shutdown,
                other => PluginReply::Error { message: format!("unhandled call in test fake: {other:?}") },
            };
            let payload = serde_json::to_vec(&reply).unwrap();
            let _ = pulse_wire::write_message(&mut stream, &payload).await;
        }
    });
    port
}

fn address_config(port: u16) -> PluginLaunchConfig {
    PluginLaunchConfig { address: Some(format!("127.0.0.1:{port}")), ..Default::default() }
}

#[tokio::test]
async fn launch_attaches_to_an_existing_address_and_records_metadata() {
    let port = fake_plugin(vec![]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");

    manager.launch(&name, &address_config(port)).await.unwrap();

    let record = manager.get(&name).unwrap();
    assert_eq!(record.state, PluginState::Running);
    assert_eq!(record.version, "1.0.0");
}

#[tokio::test]
async fn launch_without_binary_or_address_marks_discovered_and_errors() {
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("nothing-configured");

    let result = manager.launch(&name, &PluginLaunchConfig::default()).await;
    assert!(result.is_err());
    assert_eq!(manager.get(&name).unwrap().state, PluginState::Discovered);
}

#[tokio::test]
async fn pause_then_resume_round_trips_state() {
    let port = fake_plugin(vec![]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");
    manager.launch(&name, &address_config(port)).await.unwrap();

    manager.pause(&name).unwrap();
    assert_eq!(manager.get(&name).unwrap().state, PluginState::Paused);

    manager.resume(&name).unwrap();
    assert_eq!(manager.get(&name).unwrap().state, PluginState::Running);
}

#[tokio::test]
async fn pause_twice_is_a_conflict() {
    let port = fake_plugin(vec![]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");
    manager.launch(&name, &address_config(port)).await.unwrap();

    manager.pause(&name).unwrap();
    let err = manager.pause(&name).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn pause_on_unknown_plugin_is_not_found() {
    let manager = PluginManager::new(Arc::new(NullSink));
    let err = manager.pause(&PluginName::from("ghost")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn execute_command_against_a_paused_plugin_is_service_unavailable() {
    let port = fake_plugin(vec![]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");
    manager.launch(&name, &address_config(port)).await.unwrap();
    manager.pause(&name).unwrap();

    let invocation = pulse_wire::CommandInvocation { name: "noop".into(), args: vec![], flags: BTreeMap::new() };
    let err = manager.execute_command(&name, invocation).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn execute_command_against_a_running_plugin_succeeds() {
    let port = fake_plugin(vec![]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");
    manager.launch(&name, &address_config(port)).await.unwrap();

    let invocation = pulse_wire::CommandInvocation { name: "noop".into(), args: vec![], flags: BTreeMap::new() };
    let result = manager.execute_command(&name, invocation).await.unwrap();
    assert_eq!(result.stdout, "ok");
}

#[tokio::test]
async fn three_consecutive_unhealthy_probes_mark_the_plugin_unhealthy_then_recovery_flips_back() {
    let port = fake_plugin(vec![false, false, false, true]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");
    manager.launch(&name, &address_config(port)).await.unwrap();

    for _ in 0..UNHEALTHY_THRESHOLD {
        manager.probe_health(&name).await.unwrap();
    }
    let invocation = pulse_wire::CommandInvocation { name: "noop".into(), args: vec![], flags: BTreeMap::new() };
    let err = manager.execute_command(&name, invocation.clone()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginUnhealthy);

    manager.probe_health(&name).await.unwrap();
    manager.execute_command(&name, invocation).await.unwrap();
}

#[test]
fn base_port_allocation_increments_per_plugin() {
    let manager = PluginManager::with_base_port(Arc::new(NullSink), 20_000);
    assert_eq!(manager.allocate_port(), 20_000);
    assert_eq!(manager.allocate_port(), 20_001);
}

#[tokio::test]
async fn shutdown_on_an_attached_plugin_acknowledges_and_marks_stopped() {
    let port = fake_plugin(vec![]).await;
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("fake");
    manager.launch(&name, &address_config(port)).await.unwrap();

    manager.shutdown(&name, Duration::from_millis(50)).await.unwrap();

    assert_eq!(manager.get(&name).unwrap().state, PluginState::Stopped);
}

#[tokio::test]
async fn shutdown_on_an_unknown_plugin_still_marks_stopped() {
    // `endpoint_of` fails for a plugin with no live endpoint, but
    // `Shutdown` has nothing to tear down in that case and still
    // leaves the record in a terminal `Stopped` state.
    let manager = PluginManager::new(Arc::new(NullSink));
    let name = PluginName::from("ghost");

    manager.shutdown(&name, Duration::from_millis(10)).await.unwrap();

    assert_eq!(manager.get(&name).unwrap().state, PluginState::Stopped);
}
