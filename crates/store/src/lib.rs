// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pulse-store: the attestation store contract the engine depends on,
//! plus the Job/ScheduledJob rows that share its persisted namespace, and bounded-storage
//! bucket accounting.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod buckets;
mod jobs;
mod snapshot;
mod state;
mod store;

pub use buckets::{BucketEvent, BucketLimits, BucketTracker};
pub use jobs::{JobStore, ScheduledJobFilter, ScheduledJobStore};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use store::{AttestationStore, AttestationSubscription, InMemoryStore, StoreError};
