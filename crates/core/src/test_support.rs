// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates (gated by `test-support`, mirrors
//! the teacher's `oj-core::test_support`).

use crate::attestation::{Attestation, AttestationId};
use crate::job::{Job, JobId, JobState};
use crate::scheduled_job::{ScheduledJob, ScheduledJobId, ScheduledJobState};
use std::collections::BTreeMap;

crate::builder! {
    pub struct AttestationBuilder => Attestation {
        computed { id: AttestationId = AttestationId::new() }
        set { subjects: Vec<String> = vec![] }
        set { predicates: Vec<String> = vec![] }
        set { contexts: Vec<String> = vec![] }
        set { actors: Vec<String> = vec![] }
        set { timestamp_ms: u64 = 0 }
        set { attributes: BTreeMap<String, serde_json::Value> = BTreeMap::new() }
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        computed { id: JobId = JobId::new() }
        into { handler: String = "noop" }
        set { payload: Vec<u8> = vec![] }
        set { state: JobState = JobState::Queued }
        set { attempt: u32 = 0 }
        option { error_message: String = None }
        set { error_kind: Option<crate::error::ErrorKind> = None }
        set { error_details: Vec<String> = vec![] }
        set { created_at_ms: u64 = 0 }
        set { started_at_ms: Option<u64> = None }
        set { finished_at_ms: Option<u64> = None }
        set { parent_scheduled_job: Option<ScheduledJobId> = None }
    }
}

crate::builder! {
    pub struct ScheduledJobBuilder => ScheduledJob {
        computed { id: ScheduledJobId = ScheduledJobId::new() }
        into { ats_code: String = "ix webhook" }
        set { interval_seconds: u64 = 3600 }
        set { state: ScheduledJobState = ScheduledJobState::Active }
        set { next_run_at_ms: u64 = 0 }
        set { origin: Option<AttestationId> = None }
        set { created_at_ms: u64 = 0 }
        set { inflight_count: u32 = 0 }
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
