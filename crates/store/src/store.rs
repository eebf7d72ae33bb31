// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AttestationStore`: the narrow contract the engine depends on. An in-memory
//! implementation backed by [`MaterializedState`] plus bounded-storage bucket accounting.

use crate::buckets::{BucketEvent, BucketLimits, BucketTracker};
use crate::state::MaterializedState;
use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_core::{Attestation, AttestationFilter, AttestationId, BucketKey};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("attestation subscription lagged, {0} events dropped")]
    Lagged(u64),
}

/// The engine-facing contract for durable, append-only attestations.
/// Concurrent reads are safe; writes are serialized.
#[async_trait]
pub trait AttestationStore: Send + Sync {
    /// Idempotent by full-content hash; returns the existing id if the
    /// content was already stored (round-trip).
    async fn put(&self, attestation: Attestation) -> AttestationId;

    /// Ordered by timestamp descending, stable tie-break by id. An empty
    /// filter returns the most recent `limit` entries.
    async fn query(&self, filter: &AttestationFilter) -> Vec<Attestation>;

    /// Direct lookup by id, used internally by the script-runner
    /// executor to fetch an `ix_handler` attestation's script body.
    /// Not part of the role-based `Query` filter surface.
    async fn get(&self, id: AttestationId) -> Option<Attestation>;

    /// At-least-once delivery of new attestations matching `filter`.
    /// Subscribers must tolerate duplicates.
    fn subscribe(&self, filter: AttestationFilter) -> AttestationSubscription;

    /// Bucket events (`storage_warning`/`storage_eviction`) produced as
    /// writes cross fill thresholds.
    fn subscribe_bucket_events(&self) -> broadcast::Receiver<BucketEvent>;

    fn bucket_fill(&self, key: &BucketKey) -> Option<f64>;
}

/// A live subscription to new attestations. Filters are applied
/// client-side against the store's unconditional attestation broadcast,
/// matching the at-least-once delivery contract.
pub struct AttestationSubscription {
    filter: AttestationFilter,
    rx: broadcast::Receiver<Attestation>,
}

impl AttestationSubscription {
    /// Waits for the next attestation matching this subscription's
    /// filter. Returns `None` only once the store itself has shut down.
    pub async fn recv(&mut self) -> Option<Attestation> {
        loop {
            match self.rx.recv().await {
                Ok(a) if self.filter.matches(&a) => return Some(a),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(dropped = n, "attestation subscriber lagged; continuing (at-least-once)");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct Inner {
    state: MaterializedState,
    content_index: HashMap<String, AttestationId>,
    buckets: BucketTracker,
}

/// In-memory, snapshot-backed implementation of [`AttestationStore`].
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    attestation_tx: broadcast::Sender<Attestation>,
    bucket_tx: broadcast::Sender<BucketEvent>,
}

impl InMemoryStore {
    pub fn new(bucket_limits: BucketLimits) -> Arc<Self> {
        Self::from_state(MaterializedState::default(), bucket_limits)
    }

    /// Rehydrate from a loaded snapshot.
    pub fn from_state(state: MaterializedState, bucket_limits: BucketLimits) -> Arc<Self> {
        let mut content_index = HashMap::new();
        let mut buckets = BucketTracker::new(bucket_limits);
        for a in state.attestations.values() {
            content_index.insert(a.content_hash(), a.id);
            for actor in &a.actors {
                for context in &a.contexts {
                    let key = BucketKey { actor: actor.clone(), context: context.clone() };
                    buckets.record_insert(&key);
                }
            }
        }
        let (attestation_tx, _) = broadcast::channel(1024);
        let (bucket_tx, _) = broadcast::channel(256);
        Arc::new(Self { inner: Mutex::new(Inner { state, content_index, buckets }), attestation_tx, bucket_tx })
    }

    /// Snapshot the current materialized state for persistence.
    pub fn snapshot_state(&self) -> MaterializedState {
        self.inner.lock().state.clone()
    }

    fn bucket_keys_for(a: &Attestation) -> Vec<BucketKey> {
        let mut keys = Vec::new();
        for actor in &a.actors {
            for context in &a.contexts {
                keys.push(BucketKey { actor: actor.clone(), context: context.clone() });
            }
        }
        keys
    }

    fn oldest_in_bucket(state: &MaterializedState, key: &BucketKey) -> Option<AttestationId> {
        state
            .attestations
            .values()
            .filter(|a| a.actors.contains(&key.actor) && a.contexts.contains(&key.context))
            .min_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms).then_with(|| a.id.as_str().cmp(b.id.as_str())))
            .map(|a| a.id)
    }
}

#[async_trait]
impl AttestationStore for InMemoryStore {
    async fn put(&self, attestation: Attestation) -> AttestationId {
        let hash = attestation.content_hash();
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.content_index.get(&hash) {
            return *existing;
        }

        let id = attestation.id;
        inner.content_index.insert(hash, id);
        let keys = Self::bucket_keys_for(&attestation);
        inner.state.attestations.insert(id, attestation.clone());

        let mut evictions = Vec::new();
        let mut warnings = Vec::new();
        for key in &keys {
            let (warning, over) = inner.buckets.record_insert(key);
            if let Some(w) = warning {
                warnings.push(w);
            }
            if over {
                if let Some(victim) = Self::oldest_in_bucket(&inner.state, key) {
                    inner.state.attestations.remove(&victim);
                    inner.content_index.retain(|_, v| *v != victim);
                    evictions.push(inner.buckets.record_eviction(key));
                }
            }
        }
        drop(inner);

        let _ = self.attestation_tx.send(attestation);
        for w in warnings {
            info!(?w, "storage bucket crossed warning threshold");
            let _ = self.bucket_tx.send(w);
        }
        for e in evictions {
            info!(?e, "storage bucket evicted an entry");
            let _ = self.bucket_tx.send(e);
        }

        id
    }

    async fn get(&self, id: AttestationId) -> Option<Attestation> {
        self.inner.lock().state.attestations.get(&id).cloned()
    }

    async fn query(&self, filter: &AttestationFilter) -> Vec<Attestation> {
        let inner = self.inner.lock();
        let mut matched: Vec<Attestation> =
            inner.state.attestations.values().filter(|a| filter.matches(a)).cloned().collect();
        matched.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms).then_with(|| b.id.as_str().cmp(a.id.as_str())));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        matched
    }

    fn subscribe(&self, filter: AttestationFilter) -> AttestationSubscription {
        AttestationSubscription { filter, rx: self.attestation_tx.subscribe() }
    }

    fn subscribe_bucket_events(&self) -> broadcast::Receiver<BucketEvent> {
        self.bucket_tx.subscribe()
    }

    fn bucket_fill(&self, key: &BucketKey) -> Option<f64> {
        self.inner.lock().buckets.fill_percent(key)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
