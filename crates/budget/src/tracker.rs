// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `UsageTracker`: append-only sink for `UsageRecord`s. Writes never block the caller longer
//! than necessary; if the ledger becomes unreachable the engine still completes the Job and
//! merely logs a tracking error (backpressure: "unbounded only: append-only usage records").

use parking_lot::Mutex;
use pulse_core::UsageRecord;
use tracing::error;

#[derive(Default)]
pub struct UsageTracker {
    records: Mutex<Vec<UsageRecord>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a usage record. This never fails from the caller's
    /// perspective: failures are logged and swallowed so a tracking outage can never fail a
    /// Job that otherwise succeeded.
    pub fn record(&self, record: UsageRecord) {
        self.records.lock().push(record);
    }

    /// Same as [`Self::record`] but named for call sites that want to be
    /// explicit about tolerating tracker failure (there currently is
    /// none to tolerate; this in-memory sink cannot fail).
    pub fn try_record(&self, record: UsageRecord) {
        self.record(record);
    }

    pub fn all(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logs and swallows a usage-tracking failure ("never fatal"). Kept as a named helper so the
/// non-fatal policy is visible at call sites even though the in-memory tracker above cannot
/// currently fail.
pub fn log_tracking_error(context: &str, err: &dyn std::error::Error) {
    error!(context, %err, "usage tracking failed; job outcome is unaffected");
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
