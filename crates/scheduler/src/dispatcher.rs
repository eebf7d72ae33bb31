// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher: a fixed-size worker pool consuming Jobs from a bounded
//! queue. Workers check budget, resolve the handler, invoke it under a
//! cancellable per-job timeout, classify failures for retry, record usage, and broadcast
//! outcomes.

use futures_util::FutureExt;
use pulse_budget::{BudgetLedger, PricingTable, UsageTracker};
use pulse_core::{
    Clock, ErrorKind, Event, EventSink, ExecContext, Job, JobId, JobState, OperationType, Period, PulseError,
    UsageRecord, UsageRecordId,
};
use pulse_store::JobStore;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::HandlerRegistry;

/// Tunables that, in production, are sourced from `PulseConfig`
/// (configuration table).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub default_job_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { workers: 4, queue_capacity: 256, max_retries: 3, default_job_timeout: Duration::from_secs(120) }
    }
}

/// Best-effort extraction of a panic payload's message; `panic!("...")` and
/// `panic!("{}", ...)` both downcast to one of these two types.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

enum Attempt {
    Success(pulse_core::ExecOutcome),
    Cancelled,
    Failed(PulseError),
}

/// Bounded-queue, fixed-pool dispatcher.
pub struct Dispatcher<C: Clock> {
    tx: mpsc::Sender<JobId>,
    rx: AsyncMutex<mpsc::Receiver<JobId>>,
    job_store: Arc<JobStore>,
    registry: Arc<HandlerRegistry>,
    ledger: Arc<BudgetLedger>,
    tracker: Arc<UsageTracker>,
    pricing: Arc<PricingTable>,
    sink: Arc<dyn EventSink>,
    clock: C,
    config: DispatcherConfig,
}

impl<C: Clock + 'static> Dispatcher<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        job_store: Arc<JobStore>,
        registry: Arc<HandlerRegistry>,
        ledger: Arc<BudgetLedger>,
        tracker: Arc<UsageTracker>,
        pricing: Arc<PricingTable>,
        sink: Arc<dyn EventSink>,
        clock: C,
        config: DispatcherConfig,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Arc::new(Self { tx, rx: AsyncMutex::new(rx), job_store, registry, ledger, tracker, pricing, sink, clock, config })
    }

    /// Admission-controlled submission (`EnqueueOnce`, boundary behavior "queue full"). The
    /// caller is responsible for having already inserted `job_id` into the job store.
    pub fn try_dispatch(&self, job_id: JobId) -> Result<(), PulseError> {
        self.tx.try_send(job_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PulseError::service_unavailable("job queue is full"),
            mpsc::error::TrySendError::Closed(_) => PulseError::service_unavailable("dispatcher is shut down"),
        })
    }

    pub fn queue_capacity(&self) -> usize {
        self.config.queue_capacity
    }

    /// Spawns the fixed-size worker pool; each worker shares the single
    /// receiver behind an async mutex and exits once `cancel` fires and
    /// the channel is drained empty, or the channel closes.
    pub fn spawn_workers(self: &Arc<Self>, cancel: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.workers.max(1))
            .map(|idx| {
                let this = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move { this.worker_loop(idx, cancel).await })
            })
            .collect()
    }

    async fn worker_loop(self: Arc<Self>, idx: usize, cancel: CancellationToken) {
        debug!(worker = idx, "dispatcher worker started");
        loop {
            let next = {
                let mut rx = self.rx.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    received = rx.recv() => received,
                }
            };
            let Some(job_id) = next else { break };
            self.process_job(job_id, cancel.child_token()).await;
        }
        debug!(worker = idx, "dispatcher worker stopped");
    }

    async fn process_job(&self, job_id: JobId, cancel: CancellationToken) {
        let now = self.clock.epoch_ms();

        // Step 1: budget gate (dispatcher step 1). Checked against every configured period;
        // any exhausted period fails the job before the handler ever runs.
        for period in Period::ALL {
            if !self.ledger.check_budget(period, now) {
                self.terminate(
                    job_id,
                    JobState::Failed,
                    PulseError::new(ErrorKind::BudgetExhausted, format!("{period} budget exhausted")),
                );
                return;
            }
        }

        let Some(job) = self.job_store.get(job_id) else {
            warn!(%job_id, "dispatched job vanished from the store before processing");
            return;
        };

        // Step 2: handler lookup (dispatcher step 2).
        let executor = match self.registry.resolve(&job.handler) {
            Ok(e) => e,
            Err(_) => {
                self.terminate(
                    job_id,
                    JobState::Failed,
                    PulseError::new(ErrorKind::HandlerNotRegistered, format!("no handler registered for `{}`", job.handler)),
                );
                return;
            }
        };

        if let Err(e) = self.job_store.update(job_id, |j| j.transition(JobState::Running, now)) {
            warn!(%job_id, error = %e, "failed to transition job to running");
            return;
        }
        self.broadcast_job(job_id);

        let timeout = executor.timeout_override().unwrap_or(self.config.default_job_timeout);
        let max_retries = self.config.max_retries.max(1);
        let mut attempt: u32 = 0;

        let outcome = loop {
            attempt += 1;
            let _ = self.job_store.update(job_id, |j| {
                j.attempt = attempt;
                Ok(())
            });
            let Some(job) = self.job_store.get(job_id) else { break Attempt::Cancelled };
            let ctx = ExecContext { job_id, attempt, deadline: timeout, cancel: cancel.clone() };

            let handler_name = job.handler.clone();
            let attempt_result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Attempt::Cancelled,
                result = tokio::time::timeout(
                    timeout,
                    AssertUnwindSafe(executor.execute(&job.payload, &ctx)).catch_unwind(),
                ) => {
                    match result {
                        Ok(Ok(Ok(outcome))) => Attempt::Success(outcome),
                        Ok(Ok(Err(e))) => Attempt::Failed(e),
                        Ok(Err(panic)) => {
                            let reason = panic_message(&panic);
                            warn!(%job_id, handler = %handler_name, reason, "handler panicked");
                            Attempt::Failed(PulseError::new(
                                ErrorKind::Internal,
                                format!("handler `{handler_name}` panicked: {reason}"),
                            ))
                        }
                        Err(_) => Attempt::Failed(PulseError::new(
                            ErrorKind::Timeout,
                            format!("handler `{}` exceeded {:?} deadline", job.handler, timeout),
                        )),
                    }
                }
            };

            match attempt_result {
                Attempt::Success(outcome) => break Attempt::Success(outcome),
                Attempt::Cancelled => break Attempt::Cancelled,
                Attempt::Failed(e) if e.kind.is_retryable() && attempt < max_retries => {
                    let backoff = Duration::from_secs(attempt as u64);
                    debug!(%job_id, attempt, ?backoff, "retrying job after retryable failure");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break Attempt::Cancelled,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    continue;
                }
                Attempt::Failed(e) => break Attempt::Failed(e),
            }
        };

        match outcome {
            Attempt::Success(outcome) => self.finish_success(job_id, &job.handler, outcome),
            Attempt::Failed(e) => self.terminate(job_id, JobState::Failed, e),
            Attempt::Cancelled => self.terminate_cancelled(job_id),
        }
    }

    fn terminate_cancelled(&self, job_id: JobId) {
        let now = self.clock.epoch_ms();
        if let Err(e) = self.job_store.update(job_id, |j| {
            j.error_message = Some("job cancelled".into());
            j.transition(JobState::Cancelled, now)
        }) {
            warn!(%job_id, error = %e, "failed to transition job to cancelled");
            return;
        }
        info!(%job_id, "job cancelled");
        self.broadcast_job(job_id);
    }

    fn finish_success(&self, job_id: JobId, handler: &str, outcome: pulse_core::ExecOutcome) {
        let now = self.clock.epoch_ms();
        if let Err(e) = self.job_store.update(job_id, |j| j.transition(JobState::Succeeded, now)) {
            warn!(%job_id, error = %e, "failed to transition job to succeeded");
            return;
        }

        let cost_usd = outcome
            .cost_usd
            .unwrap_or_else(|| {
                self.pricing.cost_usd(
                    outcome.model_provider.as_deref(),
                    outcome.model_name.as_deref(),
                    outcome.prompt_tokens.unwrap_or(0),
                    outcome.completion_tokens.unwrap_or(0),
                )
            });
        if cost_usd > 0.0 {
            for period in Period::ALL {
                self.ledger.spend(period, cost_usd, None, now);
            }
        }
        self.tracker.record(UsageRecord {
            id: UsageRecordId::new(),
            operation_type: OperationType::PluginCommand,
            entity_type: "job".into(),
            entity_id: job_id.to_string(),
            model_name: outcome.model_name,
            model_provider: outcome.model_provider,
            request_at_ms: now,
            response_at_ms: now,
            prompt_tokens: outcome.prompt_tokens,
            completion_tokens: outcome.completion_tokens,
            cost_usd,
            success: true,
            error_message: None,
        });
        info!(%job_id, handler, cost_usd, "job succeeded");
        self.broadcast_job(job_id);
    }

    fn terminate(&self, job_id: JobId, state: JobState, err: PulseError) {
        let now = self.clock.epoch_ms();
        let result = if state == JobState::Failed {
            self.job_store.update(job_id, |j| j.fail(&err, now))
        } else {
            self.job_store.update(job_id, |j| {
                j.error_message = Some(err.message.clone());
                j.error_kind = Some(err.kind);
                j.error_details = err.details.clone();
                j.transition(state, now)
            })
        };
        if let Err(e) = result {
            warn!(%job_id, error = %e, "failed to transition job to terminal state");
            return;
        }
        if let Some(job) = self.job_store.get(job_id) {
            self.tracker.record(UsageRecord {
                id: UsageRecordId::new(),
                operation_type: OperationType::PluginCommand,
                entity_type: "job".into(),
                entity_id: job_id.to_string(),
                model_name: None,
                model_provider: None,
                request_at_ms: job.created_at_ms,
                response_at_ms: now,
                prompt_tokens: None,
                completion_tokens: None,
                cost_usd: 0.0,
                success: false,
                error_message: Some(err.message.clone()),
            });
        }
        warn!(%job_id, kind = %err.kind, message = %err.message, "job terminated");
        self.broadcast_job(job_id);
    }

    fn broadcast_job(&self, job_id: JobId) {
        let Some(job) = self.job_store.get(job_id) else { return };
        self.sink.emit(Event::JobUpdate {
            id: job.id,
            state: job.state.to_string(),
            error_message: job.error_message,
            error_details: job.error_details,
            error_kind: job.error_kind,
        });
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
