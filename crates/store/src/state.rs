// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state: one logical namespace holding attestations,
//! scheduled-job rows, job rows, usage records, and schema-version
//! metadata ("Persisted state layout").

use pulse_core::{Attestation, AttestationId, Job, JobId, ScheduledJob, ScheduledJobId, UsageRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub attestations: HashMap<AttestationId, Attestation>,
    pub scheduled_jobs: HashMap<ScheduledJobId, ScheduledJob>,
    pub jobs: HashMap<JobId, Job>,
    #[serde(default)]
    pub usage_records: Vec<UsageRecord>,
}
