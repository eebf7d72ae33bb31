// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DTOs for the plugin RPC contract. Each variant of [`PluginCall`] is a tagged request;
//! [`PluginReply`] is its matching response. The manager's RPC proxy serializes a call, writes
//! it as a length-prefixed frame, and reads back exactly one reply.

use pulse_core::CommandDef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Base URLs of core service endpoints the plugin may call back into
    /// (`Initialize(service_endpoints, config)`).
    pub service_endpoints: BTreeMap<String, String>,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInvocation {
    pub name: String,
    pub args: Vec<String>,
    pub flags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    /// Path including query string.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub healthy: bool,
    pub message: Option<String>,
    pub details: BTreeMap<String, String>,
}

/// One RPC call to a plugin, tagged by method name (contract per plugin).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PluginCall {
    Metadata,
    Initialize(InitializeRequest),
    Shutdown { deadline_ms: u64 },
    Commands,
    ExecuteCommand(CommandInvocation),
    HandleHttp(HttpRequest),
    Health,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", content = "value")]
pub enum PluginReply {
    Metadata { name: String, version: String, core_version_constraint: String, description: String },
    Initialize { ok: bool, error: Option<String> },
    Shutdown,
    Commands { commands: Vec<CommandDef> },
    ExecuteCommand(CommandResult),
    HandleHttp(HttpResponse),
    Health(HealthCheck),
    Error { message: String },
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
