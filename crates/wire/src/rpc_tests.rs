// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn plugin_call_tags_by_method_name() {
    let call = PluginCall::ExecuteCommand(CommandInvocation {
        name: "deploy".into(),
        args: vec!["--prod".into()],
        flags: BTreeMap::new(),
    });
    let json = serde_json::to_value(&call).unwrap();
    assert_eq!(json["method"], "ExecuteCommand");
    assert_eq!(json["params"]["name"], "deploy");
}

#[test]
fn health_round_trips() {
    let call = PluginCall::Health;
    let json = serde_json::to_string(&call).unwrap();
    let back: PluginCall = serde_json::from_str(&json).unwrap();
    assert!(matches!(back, PluginCall::Health));
}

#[test]
fn reply_error_variant_carries_message() {
    let reply = PluginReply::Error { message: "boom".into() };
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["result"], "Error");
    assert_eq!(json["value"]["message"], "boom");
}
