// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of WebSocket frame types fanned out by the broadcaster.
//! Serializes as a single JSON object per frame tagged by `type`; unknown types deserialize
//! to `Custom` so both sides can stay forward compatible.

use crate::budget::Period;
use crate::error::ErrorKind;
use crate::job::JobId;
use crate::scheduled_job::ScheduledJobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id! {
    /// Identifies one broadcaster subscriber connection.
    pub struct SubscriberId("sub-");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetWindowView {
    pub period: Period,
    pub local: f64,
    pub aggregate: f64,
    pub node_limit: Option<f64>,
    pub cluster_limit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledJobAction {
    Created,
    Paused,
    Resumed,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseDaemonAction {
    Start,
    Stop,
}

/// Events that cross the WebSocket boundary, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "version")]
    Version { build: String, protocol: u32 },

    #[serde(rename = "job_update")]
    JobUpdate {
        id: JobId,
        state: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        error_details: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
    },

    #[serde(rename = "daemon_status")]
    DaemonStatus {
        running: bool,
        active_jobs: u64,
        budget: Vec<BudgetWindowView>,
    },

    #[serde(rename = "plugin_health")]
    PluginHealth {
        plugin: String,
        healthy: bool,
        state: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    #[serde(rename = "storage_warning")]
    StorageWarning {
        actor: String,
        context: String,
        current: u64,
        limit: u64,
        fill_percent: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_until_full_seconds: Option<u64>,
    },

    #[serde(rename = "storage_eviction")]
    StorageEviction {
        actor: String,
        context: String,
        event_type: String,
        message: String,
    },

    #[serde(rename = "scheduled_job_update")]
    ScheduledJobUpdate { id: ScheduledJobId, action: ScheduledJobAction, state: String },

    #[serde(rename = "system_capabilities")]
    SystemCapabilities { flags: BTreeMap<String, bool> },

    /// Client -> server: ATS query text + cursor position, routed to the
    /// external query executor (out of scope beyond the interface: the engine never interprets
    /// the text itself).
    #[serde(rename = "query")]
    Query { text: String, cursor: usize },

    /// Client -> server: start/stop the Pulse daemon loop.
    #[serde(rename = "pulse_daemon_control")]
    PulseDaemonControl { action: PulseDaemonAction },

    /// Unknown type tags deserialize here; never produced by this core.
    #[serde(other, skip_serializing)]
    Custom,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
