// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-storage bucket accounting.
//!
//! The store enforces per-`(actor, context)` count limits. The engine never chooses what to
//! evict; it only observes `BucketEvent`s emitted here as attestations are written.

use pulse_core::BucketKey;
use std::collections::HashMap;

/// Per-bucket configuration. A limit of 0 means unbounded (no eviction,
/// no warnings).
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketLimits {
    pub default_limit: u64,
}

/// Emitted by the store as writes cross fill thresholds.
#[derive(Debug, Clone, PartialEq)]
pub enum BucketEvent {
    /// Crossed 50% fill on the way up.
    Warning { actor: String, context: String, current: u64, limit: u64, fill_percent: f64 },
    /// An attestation was evicted to stay within the bucket's limit.
    Eviction { actor: String, context: String, event_type: String, message: String, current: u64, limit: u64 },
}

#[derive(Debug, Default, Clone)]
struct BucketCounter {
    count: u64,
    warned: bool,
}

/// Tracks fill state per `(actor, context)` bucket and decides when to
/// warn or evict. Pure bookkeeping: the caller (the store) is
/// responsible for actually removing attestations named by
/// `evict_one`'s return.
#[derive(Debug, Default)]
pub struct BucketTracker {
    limits: BucketLimits,
    counters: HashMap<BucketKey, BucketCounter>,
}

impl BucketTracker {
    pub fn new(limits: BucketLimits) -> Self {
        Self { limits, counters: HashMap::new() }
    }

    fn limit_for(&self, _key: &BucketKey) -> u64 {
        self.limits.default_limit
    }

    /// Record one more item in the bucket, returning any warning event
    /// and whether the bucket is now over its limit (the caller must
    /// evict the oldest item(s) and call [`Self::record_eviction`]).
    pub fn record_insert(&mut self, key: &BucketKey) -> (Option<BucketEvent>, bool) {
        let limit = self.limit_for(key);
        let counter = self.counters.entry(key.clone()).or_default();
        counter.count += 1;

        if limit == 0 {
            return (None, false);
        }

        let fill_percent = counter.count as f64 / limit as f64;
        let warning = if fill_percent >= 0.5 && !counter.warned {
            counter.warned = true;
            Some(BucketEvent::Warning {
                actor: key.actor.clone(),
                context: key.context.clone(),
                current: counter.count,
                limit,
                fill_percent,
            })
        } else {
            None
        };

        let over = counter.count > limit;
        (warning, over)
    }

    /// Record that one item was evicted from the bucket to satisfy its
    /// limit, producing the eviction event (`current <= limit` after each eviction).
    pub fn record_eviction(&mut self, key: &BucketKey) -> BucketEvent {
        let limit = self.limit_for(key);
        let counter = self.counters.entry(key.clone()).or_default();
        counter.count = counter.count.saturating_sub(1);
        BucketEvent::Eviction {
            actor: key.actor.clone(),
            context: key.context.clone(),
            event_type: "bucket_full".to_string(),
            message: format!(
                "bucket ({}, {}) exceeded limit {limit}, evicted oldest entry",
                key.actor, key.context
            ),
            current: counter.count,
            limit,
        }
    }

    pub fn current(&self, key: &BucketKey) -> u64 {
        self.counters.get(key).map(|c| c.count).unwrap_or(0)
    }

    pub fn fill_percent(&self, key: &BucketKey) -> Option<f64> {
        let limit = self.limit_for(key);
        if limit == 0 {
            return None;
        }
        Some(self.current(key) as f64 / limit as f64)
    }
}

#[cfg(test)]
#[path = "buckets_tests.rs"]
mod tests;
