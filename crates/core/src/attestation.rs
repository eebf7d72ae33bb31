// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attestation: the universal datum.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

crate::define_id! {
    /// Unique identifier for an attestation. Stable across `Put` retries
    /// of identical content (idempotent by content hash).
    pub struct AttestationId("att-");
}

/// The predicate value that marks an attestation's body as an executable
/// script handed to the scripting plugin (`ix_handler`).
pub const IX_HANDLER_PREDICATE: &str = "ix_handler";

/// An immutable structured claim with subject/predicate/context/actor/time
/// roles and a free-form attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub id: AttestationId,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Attestation {
    /// Whether this attestation's body is an executable handler script.
    pub fn is_ix_handler(&self) -> bool {
        self.predicates.iter().any(|p| p == IX_HANDLER_PREDICATE)
    }

    /// The script body for an `ix_handler` attestation, if present.
    pub fn handler_script(&self) -> Option<&str> {
        if !self.is_ix_handler() {
            return None;
        }
        self.attributes.get("script").and_then(Value::as_str)
    }

    /// Content hash used for idempotent `Put`. Deliberately excludes `id` and `timestamp_ms`
    /// so that identical content submitted twice hashes the same regardless of when the id was
    /// assigned.
    pub fn content_hash(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.subjects.hash(&mut hasher);
        self.predicates.hash(&mut hasher);
        self.contexts.hash(&mut hasher);
        self.actors.hash(&mut hasher);
        // attributes: hash a stable serialization since Value isn't Hash.
        if let Ok(s) = serde_json::to_string(&self.attributes) {
            s.hash(&mut hasher);
        }
        format!("{:016x}", hasher.finish())
    }
}

/// Query filter for `Query`/`Subscribe`. Each field is a set to intersect with OR semantics
/// inside the set; empty means "no constraint on this role".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttestationFilter {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<String>,
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub since_ms: Option<u64>,
    #[serde(default)]
    pub until_ms: Option<u64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AttestationFilter {
    pub fn matches(&self, a: &Attestation) -> bool {
        fn role_matches(filter: &[String], values: &[String]) -> bool {
            filter.is_empty() || filter.iter().any(|f| values.iter().any(|v| v == f))
        }
        role_matches(&self.subjects, &a.subjects)
            && role_matches(&self.predicates, &a.predicates)
            && role_matches(&self.contexts, &a.contexts)
            && role_matches(&self.actors, &a.actors)
            && self.since_ms.map(|since| a.timestamp_ms >= since).unwrap_or(true)
            && self.until_ms.map(|until| a.timestamp_ms <= until).unwrap_or(true)
    }
}

/// `(actor, context)` pair used for bounded-storage accounting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub actor: String,
    pub context: String,
}

/// Observed fill state of a storage bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBucket {
    pub actor: String,
    pub context: String,
    pub current: u64,
    pub limit: u64,
    pub fill_percent: f64,
    /// Projected seconds until full at the observed fill rate, if estimable.
    pub time_until_full_seconds: Option<u64>,
}

#[cfg(test)]
#[path = "attestation_tests.rs"]
mod tests;
