// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end HTTP surface tests (spec §8 testable properties), driven
//! against a real bound `TcpListener` the way
//! `golem-worker-gateway`'s integration tests exercise an `axum` router:
//! bind `127.0.0.1:0`, spawn `axum::serve`, drive it with `reqwest`.
//!
//! These construct `AppState` directly rather than through
//! `pulse_server::startup::start`, since startup launches real plugin
//! child processes and reads the process environment/filesystem for
//! config — neither of which belongs in a unit-scoped HTTP test.

use async_trait::async_trait;
use parking_lot::RwLock;
use pulse_broadcast::Broadcaster;
use pulse_budget::{BudgetLedger, PricingTable, UsageTracker};
use pulse_core::{EventSink, ExecContext, ExecOutcome, Executor, NodeConfig, PulseResult, SystemClock};
use pulse_plugins::PluginManager;
use pulse_scheduler::{Dispatcher, DispatcherConfig, HandlerRegistry, Scheduler, SchedulerConfig};
use pulse_server::state::AppState;
use pulse_store::{InMemoryStore, JobStore, ScheduledJobStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(&self, _payload: &[u8], _ctx: &ExecContext) -> PulseResult<ExecOutcome> {
        Ok(ExecOutcome { cost_usd: Some(0.01), ..Default::default() })
    }
}

fn test_state() -> AppState {
    test_state_with_ledger(Arc::new(BudgetLedger::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 600_000)))
}

fn test_state_with_ledger(ledger: Arc<BudgetLedger>) -> AppState {
    let broadcaster = Broadcaster::new(64);
    let sink: Arc<dyn EventSink> = broadcaster.clone();
    let store = InMemoryStore::new(pulse_store::BucketLimits { default_limit: 1_000 });
    let job_store = Arc::new(JobStore::new());
    let scheduled_store = Arc::new(ScheduledJobStore::new());
    let tracker = Arc::new(UsageTracker::new());
    let pricing = Arc::new(PricingTable::new());
    let registry = HandlerRegistry::new();
    registry.register("webhook", Arc::new(EchoExecutor)).expect("register test executor");
    let plugins = PluginManager::new(sink.clone());

    let dispatcher = Dispatcher::new(
        job_store.clone(),
        registry.clone(),
        ledger.clone(),
        tracker.clone(),
        pricing.clone(),
        sink.clone(),
        SystemClock,
        DispatcherConfig { workers: 2, queue_capacity: 16, max_retries: 1, default_job_timeout: Duration::from_secs(5) },
    );
    let scheduler = Scheduler::new(
        scheduled_store,
        job_store.clone(),
        dispatcher.clone(),
        sink.clone(),
        SystemClock,
        SchedulerConfig { tick_interval: Duration::from_millis(50), max_inflight_per_schedule: 1 },
    );

    AppState {
        config: Arc::new(RwLock::new(NodeConfig::default())),
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
        shutdown: CancellationToken::new(),
    }
}

/// Spawns the router on an ephemeral port and returns its base URL plus
/// the `AppState` so the test can inspect internal state directly.
async fn spawn_server(state: AppState) -> (String, AppState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let router = pulse_server::routes::create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server exited unexpectedly");
    });
    let dispatcher = state.dispatcher.clone();
    let _workers = dispatcher.spawn_workers(state.shutdown.clone());
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn health_reports_protocol_and_build() {
    let (base, _state) = spawn_server(test_state()).await;
    let resp = reqwest::get(format!("{base}/api/health")).await.expect("request");
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.expect("json body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["protocol"], 1);
}

#[tokio::test]
async fn create_schedule_then_fire_once_produces_a_job() {
    let (base, state) = spawn_server(test_state()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/pulse/schedules"))
        .json(&serde_json::json!({ "ats_code": "ix webhook", "interval_seconds": 3600 }))
        .send()
        .await
        .expect("create schedule");
    assert_eq!(resp.status(), 200);
    let schedule: serde_json::Value = resp.json().await.expect("schedule body");
    assert_eq!(schedule["state"], "active");

    let job = state.scheduler.enqueue_once("webhook", b"{}".to_vec()).expect("enqueue once");
    tokio::time::sleep(Duration::from_millis(200)).await;

    let resp = client.get(format!("{base}/api/pulse/executions/{}", job.id)).send().await.expect("get execution");
    assert_eq!(resp.status(), 200);
    let execution: serde_json::Value = resp.json().await.expect("execution body");
    assert_eq!(execution["id"], job.id.to_string());
}

#[tokio::test]
async fn pausing_a_schedule_is_reflected_in_its_state() {
    let (base, _state) = spawn_server(test_state()).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("{base}/api/pulse/schedules"))
        .json(&serde_json::json!({ "ats_code": "ix webhook", "interval_seconds": 60 }))
        .send()
        .await
        .expect("create schedule")
        .json()
        .await
        .expect("schedule body");
    let id = created["id"].as_str().expect("schedule id").to_string();

    let paused: serde_json::Value = client
        .patch(format!("{base}/api/pulse/schedules/{id}"))
        .json(&serde_json::json!({ "action": "pause" }))
        .send()
        .await
        .expect("pause schedule")
        .json()
        .await
        .expect("paused body");
    assert_eq!(paused["state"], "paused");
}

#[tokio::test]
async fn unknown_schedule_action_is_a_400() {
    let (base, _state) = spawn_server(test_state()).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("{base}/api/pulse/schedules"))
        .json(&serde_json::json!({ "ats_code": "ix webhook", "interval_seconds": 60 }))
        .send()
        .await
        .expect("create schedule")
        .json()
        .await
        .expect("schedule body");
    let id = created["id"].as_str().expect("schedule id").to_string();

    let resp = client
        .patch(format!("{base}/api/pulse/schedules/{id}"))
        .json(&serde_json::json!({ "action": "levitate" }))
        .send()
        .await
        .expect("bad action request");
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.expect("error body");
    assert_eq!(body["category"], "invalid_request");
}

#[tokio::test]
async fn nonexistent_schedule_is_a_404() {
    let (base, _state) = spawn_server(test_state()).await;
    let resp = reqwest::get(format!("{base}/api/pulse/schedules/schedule-does-not-exist")).await.expect("request");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn exhausted_budget_fails_the_job_before_the_handler_runs() {
    // Daily limit of 1 cent, already spent: every dispatch must fail at
    // the budget gate without ever reaching the executor (spec §4.1
    // dispatcher step 1, §8 invariant "allowed iff aggregate < limit").
    let ledger = Arc::new(BudgetLedger::new([0.01, 0.0, 0.0], [0.0, 0.0, 0.0], 600_000));
    ledger.spend(pulse_core::Period::Daily, 0.01, None, SystemClock.epoch_ms());
    let state = test_state_with_ledger(ledger);
    let _workers = state.dispatcher.spawn_workers(state.shutdown.clone());

    let job = state.scheduler.enqueue_once("webhook", b"{}".to_vec()).expect("enqueue once");
    tokio::time::sleep(Duration::from_millis(150)).await;

    let stored = state.job_store.get(job.id).expect("job still in store");
    assert_eq!(stored.state, pulse_core::JobState::Failed);
    assert_eq!(stored.error_kind, Some(pulse_core::ErrorKind::BudgetExhausted));
}

#[tokio::test]
async fn config_roundtrips_through_get_and_put() {
    let (base, state) = spawn_server(test_state()).await;
    let client = reqwest::Client::new();

    let mut cfg: NodeConfig = client.get(format!("{base}/api/config")).send().await.expect("get config").json().await.expect("config body");
    cfg.budget.daily_limit = 12.5;

    let updated: NodeConfig = client
        .put(format!("{base}/api/config"))
        .json(&cfg)
        .send()
        .await
        .expect("put config")
        .json()
        .await
        .expect("updated config body");
    assert_eq!(updated.budget.daily_limit, 12.5);
    assert_eq!(state.config_snapshot().budget.daily_limit, 12.5);
}
