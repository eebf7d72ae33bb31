// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler: the public contract over `ScheduledJob` plus the tick loop that materializes due
//! schedules into Jobs and hands them to the [`Dispatcher`]. The tick's selection-and-advance
//! step is the one critical section in the whole engine that must never block: it only touches
//! in-memory maps guarded by short `parking_lot` locks inside `pulse-store`.

use pulse_core::{
    AttestationId, Clock, Event, EventSink, Job, ScheduledJob, ScheduledJobAction, ScheduledJobId, ScheduledJobState,
};
use pulse_store::{JobStore, ScheduledJobFilter, ScheduledJobStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;

/// Tunables sourced from `PulseConfig`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    /// Default "a new instance is only created after the previous instance reaches a terminal
    /// state" bound.
    pub max_inflight_per_schedule: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_millis(500), max_inflight_per_schedule: 1 }
    }
}

/// Pulse scheduler: owns `ScheduledJob.next_run_at` and Job creation.
pub struct Scheduler<C: Clock> {
    scheduled_store: Arc<ScheduledJobStore>,
    job_store: Arc<JobStore>,
    dispatcher: Arc<Dispatcher<C>>,
    sink: Arc<dyn EventSink>,
    clock: C,
    config: SchedulerConfig,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(
        scheduled_store: Arc<ScheduledJobStore>,
        job_store: Arc<JobStore>,
        dispatcher: Arc<Dispatcher<C>>,
        sink: Arc<dyn EventSink>,
        clock: C,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self { scheduled_store, job_store, dispatcher, sink, clock, config })
    }

    /// `CreateScheduled`: validates `interval_seconds > 0`, assigns an id, sets
    /// `state=active`, `next_run_at = now + interval`.
    pub fn create_scheduled(
        &self,
        ats_code: impl Into<String>,
        interval_seconds: u64,
        origin: Option<AttestationId>,
    ) -> pulse_core::PulseResult<ScheduledJob> {
        if interval_seconds == 0 {
            return Err(pulse_core::PulseError::invalid_request("interval_seconds must be greater than zero"));
        }
        let now = self.clock.epoch_ms();
        let job = ScheduledJob {
            id: ScheduledJobId::new(),
            ats_code: ats_code.into(),
            interval_seconds,
            state: ScheduledJobState::Active,
            next_run_at_ms: now + interval_seconds * 1000,
            origin,
            created_at_ms: now,
            inflight_count: 0,
        };
        self.scheduled_store.insert(job.clone())?;
        self.emit_scheduled_update(job.id, ScheduledJobAction::Created, job.state);
        Ok(job)
    }

    /// `Pause`: idempotent; `NotFound` if missing, `Conflict` if `state=inactive`.
    pub fn pause(&self, id: ScheduledJobId) -> pulse_core::PulseResult<ScheduledJob> {
        let job = self.scheduled_store.update(id, |j| {
            match j.state {
                ScheduledJobState::Inactive => Err(pulse_core::PulseError::conflict(format!("scheduled job {id} is deleted"))),
                ScheduledJobState::Paused => Ok(()),
                ScheduledJobState::Active => {
                    j.state = ScheduledJobState::Paused;
                    Ok(())
                }
            }
        })?;
        self.emit_scheduled_update(id, ScheduledJobAction::Paused, job.state);
        Ok(job)
    }

    /// `Resume`: re-arms `next_run_at` relative to now so a long pause does not trigger an
    /// immediate catch-up storm.
    pub fn resume(&self, id: ScheduledJobId) -> pulse_core::PulseResult<ScheduledJob> {
        let now = self.clock.epoch_ms();
        let job = self.scheduled_store.update(id, |j| {
            match j.state {
                ScheduledJobState::Inactive => Err(pulse_core::PulseError::conflict(format!("scheduled job {id} is deleted"))),
                ScheduledJobState::Active => Ok(()),
                ScheduledJobState::Paused => {
                    j.state = ScheduledJobState::Active;
                    j.next_run_at_ms = now + j.interval_seconds * 1000;
                    Ok(())
                }
            }
        })?;
        self.emit_scheduled_update(id, ScheduledJobAction::Resumed, job.state);
        Ok(job)
    }

    /// `Delete`: soft-delete to `inactive`; rows are never hard-removed.
    pub fn delete(&self, id: ScheduledJobId) -> pulse_core::PulseResult<ScheduledJob> {
        let job = self.scheduled_store.update(id, |j| {
            j.state = ScheduledJobState::Inactive;
            Ok(())
        })?;
        self.emit_scheduled_update(id, ScheduledJobAction::Deleted, job.state);
        Ok(job)
    }

    pub fn get(&self, id: ScheduledJobId) -> Option<ScheduledJob> {
        self.scheduled_store.get(id)
    }

    /// `List`: ordered by `next_run_at` ascending for active, then others.
    pub fn list(&self, filter: &ScheduledJobFilter) -> Vec<ScheduledJob> {
        self.scheduled_store.list(filter)
    }

    /// `EnqueueOnce`: admission-controlled one-shot Job.
    pub fn enqueue_once(&self, handler: impl Into<String>, payload: Vec<u8>) -> pulse_core::PulseResult<Job> {
        let now = self.clock.epoch_ms();
        let job = Job::new(handler, payload, now);
        self.job_store.insert(job.clone());
        if let Err(e) = self.dispatcher.try_dispatch(job.id) {
            // Queue full: no Job is persisted. Undo the staged insert
            // rather than leaving a row stuck in `Queued` forever.
            self.job_store.remove(job.id);
            return Err(e);
        }
        Ok(job)
    }

    fn emit_scheduled_update(&self, id: ScheduledJobId, action: ScheduledJobAction, state: ScheduledJobState) {
        self.sink.emit(Event::ScheduledJobUpdate { id, action, state: state.to_string() });
    }

    /// Spawns the long-lived tick task ("the scheduler tick... are long-lived tasks"). Stops
    /// once `cancel` fires.
    pub fn spawn_tick_loop(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.config.tick_interval);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => this.tick(),
                }
            }
            debug!("scheduler tick loop stopped");
        })
    }

    /// One tick ("Tick algorithm"): atomically selects all due active schedules in ascending
    /// `next_run_at` order (tie-break by id), materializes a Job for each that is not already
    /// at its `max_inflight_per_schedule` bound, and advances `next_run_at` by exactly one
    /// occurrence so drift cannot compound.
    pub fn tick(&self) {
        let now = self.clock.epoch_ms();
        let due = self.scheduled_store.due(now);
        for schedule in due {
            let inflight = self.job_store.inflight_count(schedule.id);
            if inflight >= self.config.max_inflight_per_schedule {
                // Previous instance hasn't reached a terminal state yet;
                // leave `next_run_at` untouched so this schedule fires
                // the moment it frees up, instead of being delayed a
                // further full interval (ordering guarantees).
                debug!(schedule = %schedule.id, inflight, "skipping tick: schedule already at max inflight");
                continue;
            }

            let handler = schedule.derived_handler_name().to_string();
            // The script-runner executor resolves its script body from an attestation id; for
            // schedules created against an `ix_handler` attestation, that id travels as the
            // Job's opaque payload ("origin document id").
            let payload = schedule.origin.map(|id| id.as_str().as_bytes().to_vec()).unwrap_or_default();
            let mut job = Job::new(handler, payload, now);
            job.parent_scheduled_job = Some(schedule.id);
            let job_id = job.id;
            self.job_store.insert(job);

            // One missed occurrence, never a catch-up storm: advance by exactly one interval
            // from the schedule's own clock, but never to a time already in the past.
            let interval_ms = schedule.interval_seconds.max(1) * 1000;
            let next_run_at_ms = std::cmp::max(schedule.next_run_at_ms + interval_ms, now + interval_ms);
            let missed = now.saturating_sub(schedule.next_run_at_ms) / interval_ms;
            if missed > 0 {
                info!(schedule = %schedule.id, missed, "scheduler tick overrun; firing a single occurrence");
            }

            if let Err(e) = self.scheduled_store.update(schedule.id, |s| {
                s.next_run_at_ms = next_run_at_ms;
                Ok(())
            }) {
                warn!(schedule = %schedule.id, error = %e, "failed to advance next_run_at");
                continue;
            }

            if let Err(e) = self.dispatcher.try_dispatch(job_id) {
                warn!(schedule = %schedule.id, %job_id, error = %e, "failed to dispatch scheduled job");
                // The job never reached the queue; land it in a terminal
                // state rather than leaving it stuck `Queued` forever,
                // which would also wedge `max_inflight_per_schedule`.
                let _ = self.job_store.update(job_id, |j| j.fail(&e, now));
                self.sink.emit(Event::JobUpdate {
                    id: job_id,
                    state: "failed".to_string(),
                    error_message: Some(e.message.clone()),
                    error_details: e.details.clone(),
                    error_kind: Some(e.kind),
                });
                continue;
            }

            self.sink.emit(Event::JobUpdate {
                id: job_id,
                state: "queued".to_string(),
                error_message: None,
                error_details: vec![],
                error_kind: None,
            });
        }
    }
}

#[cfg(test)]
#[path = "ticker_tests.rs"]
mod tests;
