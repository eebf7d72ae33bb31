// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root: resolves config, rehydrates the store from its last snapshot, wires every
//! component together, and spawns the long-lived tasks ("the scheduler tick, broadcaster, and
//! plugin health probes are long-lived tasks"). Ordering is grounded on `oj-
//! daemon::lifecycle::startup` (config → storage → event bus → bring-up of dependent
//! components).

use crate::config;
use crate::state::AppState;
use parking_lot::RwLock;
use pulse_broadcast::Broadcaster;
use pulse_budget::{BudgetLedger, PricingTable, UsageTracker};
use pulse_core::{Event, EventSink, NodeConfig, Period, PluginName, SystemClock};
use pulse_plugins::{spawn_health_prober, PluginManager};
use pulse_scheduler::{Dispatcher, DispatcherConfig, HandlerRegistry, Scheduler, SchedulerConfig, ScriptRunnerExecutor};
use pulse_store::{InMemoryStore, JobStore, ScheduledJobStore, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Bucket limit applied to every `(actor, context)` pair; not yet exposed as its own config
/// key, so a fixed conservative default is used until the config surface grows one.
const DEFAULT_BUCKET_LIMIT: u64 = 10_000;

const BROADCAST_BUFFER_CAPACITY: usize = 256;
const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(15);
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Shutdown grace period: how long the dispatcher is given to drain
/// in-flight jobs and plugins are given to exit cleanly before a
/// force-kill.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] pulse_store::SnapshotError),
}

/// Every long-lived task handle spawned at startup, joined during
/// shutdown (shutdown sequencing).
pub struct Handles {
    pub tick_loop: JoinHandle<()>,
    pub workers: Vec<JoinHandle<()>>,
    pub health_probers: Vec<JoinHandle<()>>,
    pub snapshot_task: JoinHandle<()>,
}

pub struct Node {
    pub state: AppState,
    pub handles: Handles,
}

pub async fn start() -> Result<Node, StartupError> {
    let node_config = config::load()?;
    info!(port = node_config.server.port, "configuration resolved");

    let database_path = PathBuf::from(&node_config.database.path);
    let materialized = Snapshot::load_or_default(&database_path).await?;
    info!(
        attestations = materialized.attestations.len(),
        scheduled_jobs = materialized.scheduled_jobs.len(),
        jobs = materialized.jobs.len(),
        "rehydrated from snapshot"
    );

    let broadcaster = Broadcaster::new(BROADCAST_BUFFER_CAPACITY);
    let sink: Arc<dyn EventSink> = broadcaster.clone();

    let store = InMemoryStore::from_state(materialized.clone(), pulse_store::BucketLimits { default_limit: DEFAULT_BUCKET_LIMIT });
    let job_store = Arc::new(JobStore::new());
    for job in materialized.jobs.values() {
        job_store.insert(job.clone());
    }
    let scheduled_store = Arc::new(ScheduledJobStore::new());
    for job in materialized.scheduled_jobs.values() {
        if let Err(e) = scheduled_store.insert(job.clone()) {
            warn!(schedule = %job.id, error = %e, "failed to rehydrate scheduled job");
        }
    }

    let ledger = Arc::new(BudgetLedger::new(
        [node_config.budget.daily_limit, node_config.budget.weekly_limit, node_config.budget.monthly_limit],
        [node_config.cluster.daily_limit, node_config.cluster.weekly_limit, node_config.cluster.monthly_limit],
        node_config.cluster.peer_staleness_seconds * 1000,
    ));
    let tracker = Arc::new(UsageTracker::new());
    let pricing = Arc::new(PricingTable::new());
    let registry = HandlerRegistry::new();
    let plugins = PluginManager::new(sink.clone());

    let dispatcher = Dispatcher::new(
        job_store.clone(),
        registry.clone(),
        ledger.clone(),
        tracker.clone(),
        pricing.clone(),
        sink.clone(),
        SystemClock,
        DispatcherConfig {
            workers: node_config.pulse.workers,
            queue_capacity: node_config.pulse.queue_capacity,
            max_retries: node_config.pulse.max_retries,
            default_job_timeout: Duration::from_secs(node_config.pulse.job_timeout_seconds),
        },
    );
    let scheduler = Scheduler::new(
        scheduled_store,
        job_store.clone(),
        dispatcher.clone(),
        sink.clone(),
        SystemClock,
        SchedulerConfig {
            tick_interval: Duration::from_millis(node_config.pulse.tick_interval_ms),
            max_inflight_per_schedule: 1,
        },
    );

    let shutdown = CancellationToken::new();

    launch_configured_plugins(&plugins, &node_config).await;
    let mut health_probers = Vec::new();
    for name in &node_config.plugin.enabled {
        health_probers.push(spawn_health_prober(
            plugins.clone(),
            PluginName::from(name.as_str()),
            HEALTH_PROBE_INTERVAL,
            shutdown.clone(),
        ));
    }

    // The script-runner executor is registered under the canonical demonstrated handler name
    // ("ats_code=\"ix webhook\""); the scripting plugin is the first enabled plugin, since
    // this config surface has no dedicated "scripting plugin" key of its own.
    if let Some(scripting_plugin) = node_config.plugin.enabled.first() {
        let executor = ScriptRunnerExecutor::new(store.clone(), plugins.clone(), PluginName::from(scripting_plugin.as_str()));
        if let Err(e) = registry.register("webhook", executor) {
            warn!(error = %e, "failed to register script-runner executor");
        }
    }

    let tick_loop = scheduler.spawn_tick_loop(shutdown.clone());
    let workers = dispatcher.spawn_workers(shutdown.clone());
    let snapshot_task = spawn_snapshot_task(store.clone(), database_path, shutdown.clone());

    let state = AppState {
        config: Arc::new(RwLock::new(node_config)),
        store,
        job_store,
        ledger,
        tracker,
        pricing,
        registry,
        plugins,
        broadcaster,
        dispatcher,
        scheduler,
        clock: SystemClock,
        shutdown,
    };

    Ok(Node { state, handles: Handles { tick_loop, workers, health_probers, snapshot_task } })
}

async fn launch_configured_plugins(plugins: &Arc<PluginManager>, cfg: &NodeConfig) {
    for name in &cfg.plugin.enabled {
        let Some(launch_cfg) = cfg.plugin.plugins.get(name) else {
            warn!(plugin = name, "plugin listed in `plugin.enabled` has no launch configuration");
            continue;
        };
        let plugin_name = PluginName::from(name.as_str());
        if let Err(e) = plugins.launch(&plugin_name, launch_cfg).await {
            warn!(plugin = name, error = %e, "plugin failed to launch at startup");
        }
    }
}

fn spawn_snapshot_task(
    store: Arc<pulse_store::InMemoryStore>,
    path: PathBuf,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SNAPSHOT_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => persist_snapshot(&store, &path).await,
            }
        }
        persist_snapshot(&store, &path).await;
    })
}

async fn persist_snapshot(store: &Arc<pulse_store::InMemoryStore>, path: &PathBuf) {
    let snapshot = Snapshot::new(store.snapshot_state(), SystemClock.epoch_ms());
    if let Err(e) = snapshot.write_to(path).await {
        warn!(error = %e, "failed to persist snapshot");
    }
}

/// Reports the per-period budget status used by the `daemon_status`
/// frame the `system_capabilities`/`version` handshake also sends,
/// exposed here so `main` can log a startup summary.
pub fn log_budget_summary(ledger: &BudgetLedger, now_ms: u64) {
    for period in Period::ALL {
        let agg = ledger.aggregate(period, now_ms);
        info!(?period, aggregate = agg.aggregate, "budget window initialized");
    }
}

/// Broadcasts the final `daemon_status` frame before the process exits
/// (graceful shutdown sequencing).
pub fn broadcast_shutdown(state: &AppState) {
    state.broadcaster.publish(Event::DaemonStatus { running: false, active_jobs: state.active_jobs(), budget: crate::routes::budget_window_views(state) });
}
