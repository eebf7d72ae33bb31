// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn plugin_name_displays_as_inner_string() {
    let name: PluginName = "scripting".into();
    assert_eq!(name.to_string(), "scripting");
}

#[test]
fn state_display_matches_spec_lifecycle_names() {
    assert_eq!(PluginState::Discovered.to_string(), "discovered");
    assert_eq!(PluginState::Running.to_string(), "running");
    assert_eq!(PluginState::Stopped.to_string(), "stopped");
}

#[test]
fn health_default_is_unhealthy_with_zero_failures() {
    let health = PluginHealth::default();
    assert!(!health.healthy);
    assert_eq!(health.consecutive_failures, 0);
}
