// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PluginRecord: an external process providing RPC capabilities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Newtype for a configured plugin's name; plugins are named in config,
/// not generated, so this is not a `define_id!` nanoid wrapper.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginName(pub String);

impl std::fmt::Display for PluginName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PluginName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle states: `unhealthy` is an overlay flag, not a distinct state, carried separately
/// on [`PluginHealth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    Discovered,
    Starting,
    Running,
    Paused,
    Stopping,
    Stopped,
}

crate::simple_display! {
    PluginState {
        Discovered => "discovered",
        Starting => "starting",
        Running => "running",
        Paused => "paused",
        Stopping => "stopping",
        Stopped => "stopped",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginHealth {
    pub healthy: bool,
    pub message: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    /// Consecutive failed probes (three marks unhealthy).
    #[serde(default)]
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandFlagSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub takes_value: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub flags: Vec<CommandFlagSpec>,
    #[serde(default)]
    pub subcommands: Vec<CommandDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub core_version_constraint: String,
    pub description: String,
}

/// How the core reaches a plugin's RPC surface once launched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PluginEndpoint {
    /// Spawned child process, listening on this local port.
    ChildProcess { pid: u32, port: u16 },
    /// Pre-existing endpoint the core attaches to.
    Address { host: String, port: u16 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRecord {
    pub name: PluginName,
    pub version: String,
    pub endpoint: Option<PluginEndpoint>,
    pub commands: Vec<CommandDef>,
    pub health: PluginHealth,
    pub state: PluginState,
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
