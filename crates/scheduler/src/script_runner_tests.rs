// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::test_support::AttestationBuilder;
use pulse_core::{AttestationId, Executor, NullSink, PluginLaunchConfig, PluginName};
use pulse_store::{BucketLimits, InMemoryStore};
use pulse_wire::{CommandResult, PluginCall, PluginReply};
use std::collections::BTreeMap;
use tokio::net::TcpListener;

async fn fake_scripting_plugin(exit_code: i32, stdout: &'static str, stderr: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let Ok(raw) = pulse_wire::read_message(&mut stream).await else { continue };
            let Ok(call) = serde_json::from_slice::<PluginCall>(&raw) else { continue };
            let reply = match call {
                PluginCall::Metadata => PluginReply::Metadata {
                    name: "scripting".into(),
                    version: "1.0.0".into(),
                    core_version_constraint: "*".into(),
                    description: "fake scripting plugin".into(),
                },
                PluginCall::Commands => PluginReply::Commands { commands: vec![] },
                PluginCall::ExecuteCommand(_) => PluginReply::ExecuteCommand(CommandResult {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    exit_code,
                }),
                PluginCall::Shutdown { .. } => PluginReply::Shutdown,
                other => PluginReply::Error { message: format!("unhandled call in test fake: {other:?}") },
            };
            let payload = serde_json::to_vec(&reply).unwrap();
            let _ = pulse_wire::write_message(&mut stream, &payload).await;
        }
    });
    port
}

async fn running_plugins(port: u16) -> Arc<PluginManager> {
    let manager = PluginManager::new(Arc::new(NullSink));
    let config = PluginLaunchConfig { address: Some(format!("127.0.0.1:{port}")), ..Default::default() };
    manager.launch(&PluginName::from("scripting"), &config).await.unwrap();
    manager
}

fn ctx() -> ExecContext {
    ExecContext {
        job_id: pulse_core::JobId::new(),
        attempt: 1,
        deadline: std::time::Duration::from_secs(5),
        cancel: tokio_util::sync::CancellationToken::new(),
    }
}

#[tokio::test]
async fn forwards_the_script_body_and_returns_stdout() {
    let port = fake_scripting_plugin(0, "hello from script", "").await;
    let plugins = running_plugins(port).await;
    let store = InMemoryStore::new(BucketLimits { default_limit: 0 });

    let mut attributes = BTreeMap::new();
    attributes.insert("script".to_string(), serde_json::Value::String("echo hello".into()));
    let attestation = AttestationBuilder::default()
        .predicates(vec![pulse_core::IX_HANDLER_PREDICATE.to_string()])
        .attributes(attributes)
        .build();
    let id = attestation.id;
    store.put(attestation).await;

    let executor = ScriptRunnerExecutor::new(store, plugins, PluginName::from("scripting"));
    let outcome = executor.execute(id.as_str().as_bytes(), &ctx()).await.unwrap();
    let stdout = outcome.result.unwrap()["stdout"].as_str().unwrap().to_string();
    assert_eq!(stdout, "hello from script");
}

#[tokio::test]
async fn rejects_a_payload_that_is_not_utf8() {
    let port = fake_scripting_plugin(0, "", "").await;
    let plugins = running_plugins(port).await;
    let store = InMemoryStore::new(BucketLimits { default_limit: 0 });
    let executor = ScriptRunnerExecutor::new(store, plugins, PluginName::from("scripting"));

    let err = executor.execute(&[0xff, 0xfe], &ctx()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn missing_attestation_is_not_found() {
    let port = fake_scripting_plugin(0, "", "").await;
    let plugins = running_plugins(port).await;
    let store = InMemoryStore::new(BucketLimits { default_limit: 0 });
    let executor = ScriptRunnerExecutor::new(store, plugins, PluginName::from("scripting"));

    let ghost = AttestationId::new();
    let err = executor.execute(ghost.as_str().as_bytes(), &ctx()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn an_attestation_without_an_ix_handler_script_is_an_invalid_request() {
    let port = fake_scripting_plugin(0, "", "").await;
    let plugins = running_plugins(port).await;
    let store = InMemoryStore::new(BucketLimits { default_limit: 0 });

    let attestation = AttestationBuilder::default().build();
    let id = attestation.id;
    store.put(attestation).await;

    let executor = ScriptRunnerExecutor::new(store, plugins, PluginName::from("scripting"));
    let err = executor.execute(id.as_str().as_bytes(), &ctx()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn a_non_zero_exit_code_is_mapped_to_an_internal_error_carrying_stderr() {
    let port = fake_scripting_plugin(1, "", "boom").await;
    let plugins = running_plugins(port).await;
    let store = InMemoryStore::new(BucketLimits { default_limit: 0 });

    let mut attributes = BTreeMap::new();
    attributes.insert("script".to_string(), serde_json::Value::String("false".into()));
    let attestation = AttestationBuilder::default()
        .predicates(vec![pulse_core::IX_HANDLER_PREDICATE.to_string()])
        .attributes(attributes)
        .build();
    let id = attestation.id;
    store.put(attestation).await;

    let executor = ScriptRunnerExecutor::new(store, plugins, PluginName::from("scripting"));
    let err = executor.execute(id.as_str().as_bytes(), &ctx()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(err.details, vec!["boom".to_string()]);
}
