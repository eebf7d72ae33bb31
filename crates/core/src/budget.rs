// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BudgetWindow: per-period spend accounting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

crate::simple_display! {
    Period {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
    }
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Monthly];
}

/// One peer's reported spend for a period, with a freshness timestamp
/// (`Aggregate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSpend {
    pub peer_id: String,
    pub amount: f64,
    pub last_seen_ms: u64,
}

/// A limit of 0 (or absent) is treated as unconstrained (boundary behavior).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limit(pub f64);

impl Limit {
    pub fn is_set(self) -> bool {
        self.0 > 0.0
    }
}

/// Per-period spend tracking with aggregate-across-peers semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetWindow {
    pub local: f64,
    pub peers: BTreeMap<String, PeerSpend>,
    pub node_limit: Option<Limit>,
    pub cluster_limit: Option<Limit>,
}

impl BudgetWindow {
    /// `aggregate = local + sum(non_stale_peer_spend)` (invariant).
    pub fn aggregate(&self, now_ms: u64, staleness_window_ms: u64) -> f64 {
        let peer_total: f64 = self
            .peers
            .values()
            .filter(|p| now_ms.saturating_sub(p.last_seen_ms) < staleness_window_ms)
            .map(|p| p.amount)
            .sum();
        self.local + peer_total
    }

    /// `min(node_limit, cluster_limit)` considering only positive values
    /// (GLOSSARY "Binding limit"); `None` if neither is set.
    pub fn binding_limit(&self) -> Option<f64> {
        let node = self.node_limit.filter(|l| l.is_set()).map(|l| l.0);
        let cluster = self.cluster_limit.filter(|l| l.is_set()).map(|l| l.0);
        match (node, cluster) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// `allowed` iff `aggregate < binding_limit` (`CheckBudget`, invariant). Unconstrained
    /// windows are always allowed.
    pub fn check(&self, now_ms: u64, staleness_window_ms: u64) -> bool {
        match self.binding_limit() {
            None => true,
            Some(limit) => self.aggregate(now_ms, staleness_window_ms) < limit,
        }
    }

    /// Fraction of the binding limit currently consumed, for the 80%
    /// warning threshold. `None` when unconstrained.
    pub fn fraction_used(&self, now_ms: u64, staleness_window_ms: u64) -> Option<f64> {
        self.binding_limit()
            .filter(|l| *l > 0.0)
            .map(|limit| self.aggregate(now_ms, staleness_window_ms) / limit)
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
