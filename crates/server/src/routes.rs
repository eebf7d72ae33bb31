// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP surface, routed the way `rustpress-server::routes::create_router` wires handlers
//! into a single `Router<AppState>`.

use crate::error::{ApiError, ApiResult};
use crate::plugin_proxy;
use crate::state::{build_info, AppState, PROTOCOL_VERSION};
use crate::websocket::ws_upgrade;
use crate::ws_proxy::ws_proxy;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use pulse_core::{
    AttestationId, BudgetWindowView, NodeConfig, Period, PluginName, PulseError, ScheduledJobId,
};
use pulse_store::ScheduledJobFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/pulse/schedules", get(list_schedules).post(create_schedule))
        .route(
            "/api/pulse/schedules/:id",
            get(get_schedule).patch(patch_schedule).delete(delete_schedule),
        )
        .route("/api/pulse/jobs", get(list_jobs))
        .route("/api/pulse/executions/:id", get(get_execution))
        .route("/api/plugins", get(list_plugins))
        .route("/api/plugins/:name/:action", post(plugin_action))
        .route("/api/config", get(get_config).put(put_config))
        .route("/ws", get(ws_upgrade))
        .route("/api/:plugin/ws", get(ws_proxy))
        .route("/api/:plugin/*rest", get(plugin_proxy::proxy).post(plugin_proxy::proxy).put(plugin_proxy::proxy).delete(plugin_proxy::proxy).patch(plugin_proxy::proxy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    build: String,
    protocol: u32,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok", build: build_info(), protocol: PROTOCOL_VERSION })
}

#[derive(Deserialize)]
struct ScheduleListQuery {
    state: Option<String>,
}

async fn list_schedules(State(state): State<AppState>, Query(q): Query<ScheduleListQuery>) -> ApiResult<Json<serde_json::Value>> {
    let filter = ScheduledJobFilter {
        state: q
            .state
            .map(|s| parse_scheduled_state(&s))
            .transpose()?,
    };
    Ok(Json(serde_json::to_value(state.scheduler.list(&filter)).unwrap_or_default()))
}

fn parse_scheduled_state(s: &str) -> Result<pulse_core::ScheduledJobState, PulseError> {
    use pulse_core::ScheduledJobState::*;
    match s {
        "active" => Ok(Active),
        "paused" => Ok(Paused),
        "inactive" => Ok(Inactive),
        other => Err(PulseError::invalid_request(format!("unknown schedule state `{other}`"))),
    }
}

#[derive(Deserialize)]
struct CreateScheduleRequest {
    ats_code: String,
    interval_seconds: u64,
    origin: Option<AttestationId>,
}

async fn create_schedule(State(state): State<AppState>, Json(req): Json<CreateScheduleRequest>) -> ApiResult<Json<serde_json::Value>> {
    let job = state.scheduler.create_scheduled(req.ats_code, req.interval_seconds, req.origin)?;
    Ok(Json(serde_json::to_value(job).unwrap_or_default()))
}

async fn get_schedule(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let id = ScheduledJobId::from_string(id);
    let job = state.scheduler.get(id).ok_or_else(|| PulseError::not_found(format!("scheduled job {id} not found")))?;
    Ok(Json(serde_json::to_value(job).unwrap_or_default()))
}

#[derive(Deserialize)]
struct PatchScheduleRequest {
    action: String,
}

async fn patch_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PatchScheduleRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = ScheduledJobId::from_string(id);
    let job = match req.action.as_str() {
        "pause" => state.scheduler.pause(id)?,
        "resume" => state.scheduler.resume(id)?,
        other => return Err(ApiError::from(PulseError::invalid_request(format!("unknown schedule action `{other}`")))),
    };
    Ok(Json(serde_json::to_value(job).unwrap_or_default()))
}

async fn delete_schedule(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let id = ScheduledJobId::from_string(id);
    let job = state.scheduler.delete(id)?;
    Ok(Json(serde_json::to_value(job).unwrap_or_default()))
}

#[derive(Deserialize)]
struct JobListQuery {
    limit: Option<usize>,
}

async fn list_jobs(State(state): State<AppState>, Query(q): Query<JobListQuery>) -> Json<serde_json::Value> {
    let jobs = state.job_store.list_recent(q.limit.unwrap_or(100));
    Json(serde_json::to_value(jobs).unwrap_or_default())
}

async fn get_execution(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let id = pulse_core::JobId::from_string(id);
    let job = state.job_store.get(id).ok_or_else(|| PulseError::not_found(format!("job {id} not found")))?;
    Ok(Json(serde_json::to_value(job).unwrap_or_default()))
}

async fn list_plugins(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.plugins.list()).unwrap_or_default())
}

async fn plugin_action(State(state): State<AppState>, Path((name, action)): Path<(String, String)>) -> ApiResult<Json<serde_json::Value>> {
    let name = PluginName::from(name.as_str());
    match action.as_str() {
        "pause" => state.plugins.pause(&name)?,
        "resume" => state.plugins.resume(&name)?,
        "restart" => restart_plugin(&state, &name).await?,
        other => return Err(ApiError::from(PulseError::invalid_request(format!("unknown plugin action `{other}`")))),
    }
    let record = state.plugins.get(&name).ok_or_else(|| PulseError::not_found(format!("plugin `{name}` not found")))?;
    Ok(Json(serde_json::to_value(record).unwrap_or_default()))
}

/// Graceful shutdown deadline for a single plugin restart (matches the
/// default Shutdown grace period).
const PLUGIN_RESTART_DEADLINE: std::time::Duration = std::time::Duration::from_secs(10);

async fn restart_plugin(state: &AppState, name: &PluginName) -> Result<(), PulseError> {
    state.plugins.shutdown(name, PLUGIN_RESTART_DEADLINE).await?;
    let cfg = state.config_snapshot();
    let launch_cfg = cfg
        .plugin
        .plugins
        .get(name.0.as_str())
        .cloned()
        .ok_or_else(|| PulseError::not_found(format!("plugin `{name}` has no launch configuration")))?;
    state.plugins.launch(name, &launch_cfg).await
}

async fn get_config(State(state): State<AppState>) -> Json<NodeConfig> {
    Json(state.config_snapshot())
}

async fn put_config(State(state): State<AppState>, Json(new_config): Json<NodeConfig>) -> Json<NodeConfig> {
    // Non-disruptive re-read: budget limits update in place; in-flight jobs and live plugin
    // connections are untouched.
    for period in Period::ALL {
        let (node, cluster) = budget_limits_for(&new_config, period);
        state.ledger.update_limits(period, node, cluster);
    }
    *state.config.write() = new_config.clone();
    Json(new_config)
}

fn budget_limits_for(cfg: &NodeConfig, period: Period) -> (f64, f64) {
    match period {
        Period::Daily => (cfg.budget.daily_limit, cfg.cluster.daily_limit),
        Period::Weekly => (cfg.budget.weekly_limit, cfg.cluster.weekly_limit),
        Period::Monthly => (cfg.budget.monthly_limit, cfg.cluster.monthly_limit),
    }
}

/// Budget window views for the `daemon_status` frame.
pub fn budget_window_views(state: &AppState) -> Vec<BudgetWindowView> {
    let now = state.now_ms();
    Period::ALL
        .into_iter()
        .map(|period| {
            let window = state.ledger.window_view(period);
            BudgetWindowView {
                period,
                local: window.local,
                aggregate: state.ledger.aggregate(period, now).aggregate,
                node_limit: window.node_limit.filter(|l| l.is_set()).map(|l| l.0),
                cluster_limit: window.cluster_limit.filter(|l| l.is_set()).map(|l| l.0),
            }
        })
        .collect()
}

/// Compiled-in optional capability flags reported on connect (`system_capabilities`).
pub fn system_capability_flags() -> BTreeMap<String, bool> {
    let mut flags = BTreeMap::new();
    flags.insert("plugin_ws_proxy".to_string(), true);
    flags.insert("snapshot_persistence".to_string(), true);
    flags
}
