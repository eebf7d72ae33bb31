// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AppState`: the composition root's shared handle set, cloned into
//! every axum handler (grounded on `rustpress-server::state::AppState`).

use parking_lot::RwLock;
use pulse_broadcast::Broadcaster;
use pulse_budget::{BudgetLedger, PricingTable, UsageTracker};
use pulse_core::{Clock, NodeConfig, SystemClock};
use pulse_plugins::PluginManager;
use pulse_scheduler::{Dispatcher, HandlerRegistry, Scheduler};
use pulse_store::{AttestationStore, JobStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Protocol version advertised to every new WebSocket connection's
/// `version` frame.
pub const PROTOCOL_VERSION: u32 = 1;

/// Build identifier reported by `/api/health` and the `version` frame.
/// `CARGO_PKG_VERSION` is the workspace-resolved crate version.
pub fn build_info() -> String {
    format!("pulse/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<NodeConfig>>,
    pub store: Arc<dyn AttestationStore>,
    pub job_store: Arc<JobStore>,
    pub ledger: Arc<BudgetLedger>,
    pub tracker: Arc<UsageTracker>,
    pub pricing: Arc<PricingTable>,
    pub registry: Arc<HandlerRegistry>,
    pub plugins: Arc<PluginManager>,
    pub broadcaster: Arc<Broadcaster>,
    pub dispatcher: Arc<Dispatcher<SystemClock>>,
    pub scheduler: Arc<Scheduler<SystemClock>>,
    pub clock: SystemClock,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Reads the resolved config under the short-lived lock
    /// (`GET /api/config`).
    pub fn config_snapshot(&self) -> NodeConfig {
        self.config.read().clone()
    }

    pub fn active_jobs(&self) -> u64 {
        self.job_store.active_count()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }
}
