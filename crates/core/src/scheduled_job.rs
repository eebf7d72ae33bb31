// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ScheduledJob: a recurring job specification.

use crate::attestation::AttestationId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a recurring schedule.
    pub struct ScheduledJobId("sch-");
}

/// Lifecycle state. `Inactive` is a terminal soft-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledJobState {
    Active,
    Paused,
    Inactive,
}

crate::simple_display! {
    ScheduledJobState {
        Active => "active",
        Paused => "paused",
        Inactive => "inactive",
    }
}

/// A recurring job specification.
///
/// `next_run_at_ms` is strictly monotonic per job once active, and is owned
/// exclusively by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: ScheduledJobId,
    pub ats_code: String,
    pub interval_seconds: u64,
    pub state: ScheduledJobState,
    pub next_run_at_ms: u64,
    pub origin: Option<AttestationId>,
    pub created_at_ms: u64,
    /// Number of Jobs derived from this schedule currently in a
    /// non-terminal state (`max_inflight_per_schedule`).
    #[serde(default)]
    pub inflight_count: u32,
}

impl ScheduledJob {
    /// The handler name derived from the ATS code ("handler = derived from ATS code"). The
    /// convention mirrors `ix webhook` -> `webhook`: the last whitespace-separated token.
    pub fn derived_handler_name(&self) -> &str {
        self.ats_code.rsplit(' ').next().unwrap_or(&self.ats_code)
    }
}

#[cfg(test)]
#[path = "scheduled_job_tests.rs"]
mod tests;
