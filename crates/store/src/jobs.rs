// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `Job`/`ScheduledJob` rows sharing the persisted namespace.
//! The scheduler is the exclusive owner of the state these stores hold; these
//! types are just the storage layer it reads and writes through.

use parking_lot::Mutex;
use pulse_core::{Job, JobId, PulseError, PulseResult, ScheduledJob, ScheduledJobId, ScheduledJobState};
use std::collections::HashMap;

/// Append-and-mutate store for materialized `Job` rows.
#[derive(Default)]
pub struct JobStore {
    rows: Mutex<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.rows.lock().insert(job.id, job);
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.rows.lock().get(&id).cloned()
    }

    /// Hard-removes a row. Only for jobs that never reached a visible
    /// state (admission failed before dispatch) — every other path
    /// transitions a job to a terminal state instead.
    pub fn remove(&self, id: JobId) {
        self.rows.lock().remove(&id);
    }

    /// Apply `f` to the stored job and persist the result.
    pub fn update<F>(&self, id: JobId, f: F) -> PulseResult<Job>
    where
        F: FnOnce(&mut Job) -> PulseResult<()>,
    {
        let mut rows = self.rows.lock();
        let job = rows.get_mut(&id).ok_or_else(|| PulseError::not_found(format!("job {id} not found")))?;
        f(job)?;
        Ok(job.clone())
    }

    /// Most recent jobs first (`GET /api/pulse/jobs`).
    pub fn list_recent(&self, limit: usize) -> Vec<Job> {
        let rows = self.rows.lock();
        let mut jobs: Vec<Job> = rows.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then_with(|| b.id.as_str().cmp(a.id.as_str())));
        jobs.truncate(limit);
        jobs
    }

    pub fn list_for_schedule(&self, scheduled_id: ScheduledJobId) -> Vec<Job> {
        let rows = self.rows.lock();
        rows.values().filter(|j| j.parent_scheduled_job == Some(scheduled_id)).cloned().collect()
    }

    /// Count jobs for `scheduled_id` currently in a non-terminal state
    /// (`max_inflight_per_schedule`).
    pub fn inflight_count(&self, scheduled_id: ScheduledJobId) -> u32 {
        let rows = self.rows.lock();
        rows.values()
            .filter(|j| j.parent_scheduled_job == Some(scheduled_id) && !j.state.is_terminal())
            .count() as u32
    }

    /// Count of all jobs currently in a non-terminal state, across every
    /// schedule (`daemon_status.active_jobs`).
    pub fn active_count(&self) -> u64 {
        self.rows.lock().values().filter(|j| !j.state.is_terminal()).count() as u64
    }
}

/// CRUD store for `ScheduledJob` rows; `next_run_at_ms` advancement and
/// state transitions are driven by the scheduler, never mutated here
/// beyond what it requests.
#[derive(Default)]
pub struct ScheduledJobStore {
    rows: Mutex<HashMap<ScheduledJobId, ScheduledJob>>,
}

/// Filter for `List`.
#[derive(Debug, Clone, Default)]
pub struct ScheduledJobFilter {
    pub state: Option<ScheduledJobState>,
}

impl ScheduledJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: ScheduledJob) -> PulseResult<()> {
        let mut rows = self.rows.lock();
        if rows.contains_key(&job.id) {
            return Err(PulseError::conflict(format!("scheduled job {} already exists", job.id)));
        }
        rows.insert(job.id, job);
        Ok(())
    }

    pub fn get(&self, id: ScheduledJobId) -> Option<ScheduledJob> {
        self.rows.lock().get(&id).cloned()
    }

    pub fn update<F>(&self, id: ScheduledJobId, f: F) -> PulseResult<ScheduledJob>
    where
        F: FnOnce(&mut ScheduledJob) -> PulseResult<()>,
    {
        let mut rows = self.rows.lock();
        let job = rows
            .get_mut(&id)
            .ok_or_else(|| PulseError::not_found(format!("scheduled job {id} not found")))?;
        f(job)?;
        Ok(job.clone())
    }

    /// Ordered by `next_run_at` ascending for active, then others (`List`).
    pub fn list(&self, filter: &ScheduledJobFilter) -> Vec<ScheduledJob> {
        let rows = self.rows.lock();
        let mut jobs: Vec<ScheduledJob> = rows
            .values()
            .filter(|j| filter.state.map(|s| s == j.state).unwrap_or(true))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            let a_active = a.state == ScheduledJobState::Active;
            let b_active = b.state == ScheduledJobState::Active;
            match (a_active, b_active) {
                (true, true) => a.next_run_at_ms.cmp(&b.next_run_at_ms).then_with(|| a.id.as_str().cmp(b.id.as_str())),
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                (false, false) => a.id.as_str().cmp(b.id.as_str()),
            }
        });
        jobs
    }

    /// All active schedules with `next_run_at <= now`, ascending
    /// `next_run_at`, tie-broken by id (tick algorithm).
    pub fn due(&self, now_ms: u64) -> Vec<ScheduledJob> {
        let rows = self.rows.lock();
        let mut due: Vec<ScheduledJob> = rows
            .values()
            .filter(|j| j.state == ScheduledJobState::Active && j.next_run_at_ms <= now_ms)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.next_run_at_ms.cmp(&b.next_run_at_ms).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        due
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
