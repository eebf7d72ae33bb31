// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `NodeConfig`: the deserialization target for the layered configuration
//! resolution described in. Layering itself (env > project file > user file > system file >
//! these defaults) is performed by `pulse-server::config` using `figment`; this type only owns
//! the shape and the compiled defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 7420 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "pulse.db".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub tick_interval_ms: u64,
    pub max_retries: u32,
    pub job_timeout_seconds: u64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
            tick_interval_ms: 500,
            max_retries: 3,
            job_timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetLimitsConfig {
    pub daily_limit: f64,
    pub weekly_limit: f64,
    pub monthly_limit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub daily_limit: f64,
    pub weekly_limit: f64,
    pub monthly_limit: f64,
    pub peer_staleness_seconds: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { daily_limit: 0.0, weekly_limit: 0.0, monthly_limit: 0.0, peer_staleness_seconds: 600 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginLaunchConfig {
    pub binary: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub enabled: Vec<String>,
    #[serde(flatten)]
    pub plugins: BTreeMap<String, PluginLaunchConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pulse: PulseConfig,
    pub budget: BudgetLimitsConfig,
    pub cluster: ClusterConfig,
    pub plugin: PluginConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            pulse: PulseConfig::default(),
            budget: BudgetLimitsConfig::default(),
            cluster: ClusterConfig::default(),
            plugin: PluginConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
