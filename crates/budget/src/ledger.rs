// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BudgetLedger`: per-period spend accounting with aggregate-across-peers
//! semantics. Reads are snapshot-consistent; writes are serialized per window (Shared
//! resources).

use parking_lot::Mutex;
use pulse_core::{BudgetWindow, Limit, PeerSpend, Period};
use std::collections::HashMap;
use tracing::{info, warn};

/// A read view of one period's aggregate state (`Aggregate`).
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub local: f64,
    pub peers: Vec<(String, f64, u64)>,
    pub aggregate: f64,
}

/// Per-period spend ledger. Node and cluster limits are set once at
/// construction from `NodeConfig`; `check_budget` and `spend` each take the window's lock for
/// their entire critical section, so no two callers can observe a stale aggregate between a
/// check and the spend it gates.
pub struct BudgetLedger {
    windows: Mutex<HashMap<Period, BudgetWindow>>,
    staleness_window_ms: u64,
    /// One-shot warning state: whether the 80% threshold has already
    /// been crossed upward for this period without having dropped back
    /// below it since ("one-shot warning").
    warned: Mutex<HashMap<Period, bool>>,
}

impl BudgetLedger {
    pub fn new(node_limits: [f64; 3], cluster_limits: [f64; 3], staleness_window_ms: u64) -> Self {
        let mut windows = HashMap::new();
        for (period, (node, cluster)) in Period::ALL.into_iter().zip(node_limits.into_iter().zip(cluster_limits)) {
            windows.insert(
                period,
                BudgetWindow {
                    local: 0.0,
                    peers: HashMap::new(),
                    node_limit: Some(Limit(node)),
                    cluster_limit: Some(Limit(cluster)),
                },
            );
        }
        Self { windows: Mutex::new(windows), staleness_window_ms, warned: Mutex::new(HashMap::new()) }
    }

    /// `allowed` iff `aggregate(P) < binding_limit(P)` (invariant). A window with no limits
    /// configured is unconstrained.
    pub fn check_budget(&self, period: Period, now_ms: u64) -> bool {
        let windows = self.windows.lock();
        windows.get(&period).map(|w| w.check(now_ms, self.staleness_window_ms)).unwrap_or(true)
    }

    /// Adds to local spend if `peer_id` is absent, else updates that
    /// peer's slot with a fresh timestamp (`Spend`). Returns whether this call caused the
    /// aggregate to cross the 80% warning threshold upward (warning emission).
    pub fn spend(&self, period: Period, amount: f64, peer_id: Option<&str>, now_ms: u64) -> bool {
        let mut windows = self.windows.lock();
        let window = windows.entry(period).or_default();

        let before = window.fraction_used(now_ms, self.staleness_window_ms);
        match peer_id {
            None => window.local += amount,
            Some(peer) => {
                window.peers.insert(
                    peer.to_string(),
                    PeerSpend { peer_id: peer.to_string(), amount, last_seen_ms: now_ms },
                );
            }
        }
        let after = window.fraction_used(now_ms, self.staleness_window_ms);
        drop(windows);

        self.note_threshold_crossing(period, before, after)
    }

    fn note_threshold_crossing(&self, period: Period, before: Option<f64>, after: Option<f64>) -> bool {
        const WARNING_THRESHOLD: f64 = 0.80;
        let mut warned = self.warned.lock();
        let was_warned = warned.get(&period).copied().unwrap_or(false);

        match after {
            Some(frac) if frac >= WARNING_THRESHOLD => {
                if !was_warned {
                    warned.insert(period, true);
                    warn!(?period, fraction = frac, "budget crossed 80% warning threshold");
                    return true;
                }
                false
            }
            _ => {
                // Dropped back below threshold (e.g. a new period rolled
                // over): re-arm the one-shot warning.
                if before.unwrap_or(0.0) >= WARNING_THRESHOLD {
                    warned.insert(period, false);
                }
                false
            }
        }
    }

    /// Spend plus the pre-check in one lock-held critical section (Open
    /// Question resolution #2): used when a handler's cost is already
    /// known before the budget gate, so a burst of concurrent workers
    /// cannot all pass the check and then jointly overshoot.
    pub fn check_and_spend(&self, period: Period, amount: f64, now_ms: u64) -> bool {
        let mut windows = self.windows.lock();
        let window = windows.entry(period).or_default();
        if !window.check(now_ms, self.staleness_window_ms) {
            return false;
        }
        let before = window.fraction_used(now_ms, self.staleness_window_ms);
        window.local += amount;
        let after = window.fraction_used(now_ms, self.staleness_window_ms);
        drop(windows);
        self.note_threshold_crossing(period, before, after);
        true
    }

    pub fn aggregate(&self, period: Period, now_ms: u64) -> Aggregate {
        let windows = self.windows.lock();
        let window = windows.get(&period).cloned().unwrap_or_default();
        let peers: Vec<(String, f64, u64)> = window
            .peers
            .values()
            .filter(|p| now_ms.saturating_sub(p.last_seen_ms) < self.staleness_window_ms)
            .map(|p| (p.peer_id.clone(), p.amount, p.last_seen_ms))
            .collect();
        let aggregate = window.aggregate(now_ms, self.staleness_window_ms);
        Aggregate { local: window.local, peers, aggregate }
    }

    pub fn window_view(&self, period: Period) -> BudgetWindow {
        self.windows.lock().get(&period).cloned().unwrap_or_default()
    }

    /// Non-disruptive re-read of budget limits after `PUT /api/config`
    /// : updates limits without touching accumulated spend.
    pub fn update_limits(&self, period: Period, node_limit: f64, cluster_limit: f64) {
        let mut windows = self.windows.lock();
        let window = windows.entry(period).or_default();
        window.node_limit = Some(Limit(node_limit));
        window.cluster_limit = Some(Limit(cluster_limit));
        info!(?period, node_limit, cluster_limit, "budget limits updated");
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
