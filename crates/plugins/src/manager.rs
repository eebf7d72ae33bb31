// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PluginManager`: discovery, launch, port allocation, health
//! tracking, and RPC/HTTP proxying for external plugin processes.
//! Plugin records are guarded by a manager-level lock; spawn, kill, and RPC calls run
//! outside that lock against a copied endpoint handle.

use crate::rpc_client::{call_with_timeout, socket_addr};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use pulse_core::{
    CommandDef, ErrorKind, Event, EventSink, PluginEndpoint, PluginHealth, PluginLaunchConfig, PluginName,
    PluginRecord, PluginState, PulseError, PulseResult,
};
use pulse_wire::{CommandInvocation, CommandResult, HttpRequest, HttpResponse, PluginCall, PluginReply};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Ports are allocated starting here and incremented among active
/// plugins.
pub const DEFAULT_BASE_PORT: u16 = 9000;

/// Default readiness deadline.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Consecutive failed probes that mark a plugin unhealthy.
pub const UNHEALTHY_THRESHOLD: u32 = 3;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the lifecycle and RPC surface of every configured plugin.
pub struct PluginManager {
    records: Mutex<HashMap<PluginName, PluginRecord>>,
    sink: Arc<dyn EventSink>,
    next_port: AtomicU16,
}

impl PluginManager {
    pub fn new(sink: Arc<dyn EventSink>) -> Arc<Self> {
        Self::with_base_port(sink, DEFAULT_BASE_PORT)
    }

    pub fn with_base_port(sink: Arc<dyn EventSink>, base_port: u16) -> Arc<Self> {
        Arc::new(Self { records: Mutex::new(HashMap::new()), sink, next_port: AtomicU16::new(base_port) })
    }

    fn allocate_port(&self) -> u16 {
        self.next_port.fetch_add(1, Ordering::SeqCst)
    }

    fn upsert_state(&self, name: &PluginName, state: PluginState) {
        let mut records = self.records.lock();
        records
            .entry(name.clone())
            .and_modify(|r| r.state = state)
            .or_insert_with(|| PluginRecord {
                name: name.clone(),
                version: String::new(),
                endpoint: None,
                commands: vec![],
                health: PluginHealth::default(),
                state,
            });
    }

    fn endpoint_of(&self, name: &PluginName) -> PulseResult<PluginEndpoint> {
        self.records
            .lock()
            .get(name)
            .and_then(|r| r.endpoint.clone())
            .ok_or_else(|| PulseError::not_found(format!("plugin `{name}` has no live endpoint")))
    }

    pub fn list(&self) -> Vec<PluginRecord> {
        self.records.lock().values().cloned().collect()
    }

    pub fn get(&self, name: &PluginName) -> Option<PluginRecord> {
        self.records.lock().get(name).cloned()
    }

    /// Launches one configured plugin: spawns a child if `binary` +
    /// `auto_start` are set, attaches to `address` otherwise, and
    /// leaves the record `Discovered` if neither applies and
    /// `auto_start` is false.
    pub async fn launch(&self, name: &PluginName, cfg: &PluginLaunchConfig) -> PulseResult<()> {
        self.upsert_state(name, PluginState::Starting);

        let endpoint = if let Some(address) = &cfg.address {
            Self::parse_address(address)?
        } else if let Some(binary) = &cfg.binary {
            if !cfg.auto_start {
                self.upsert_state(name, PluginState::Discovered);
                return Ok(());
            }
            self.spawn_child(name, binary, cfg).await?
        } else {
            self.upsert_state(name, PluginState::Discovered);
            return Err(PulseError::invalid_request(format!(
                "plugin `{name}` has neither `binary` nor `address` configured"
            )));
        };

        self.wait_for_readiness(&endpoint, DEFAULT_READY_TIMEOUT).await?;

        {
            let mut records = self.records.lock();
            if let Some(record) = records.get_mut(name) {
                record.endpoint = Some(endpoint.clone());
            }
        }

        let metadata = call_with_timeout(&endpoint, PluginCall::Metadata, RPC_TIMEOUT).await?;
        let commands = call_with_timeout(&endpoint, PluginCall::Commands, RPC_TIMEOUT).await?;

        let version = match metadata {
            PluginReply::Metadata { version, .. } => version,
            other => return Err(PulseError::internal(format!("unexpected reply to Metadata: {other:?}"))),
        };
        let commands = match commands {
            PluginReply::Commands { commands } => commands,
            other => return Err(PulseError::internal(format!("unexpected reply to Commands: {other:?}"))),
        };

        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(name) {
            record.version = version;
            record.commands = commands;
            record.state = PluginState::Running;
        }
        drop(records);

        info!(plugin = %name, "plugin running");
        Ok(())
    }

    async fn spawn_child(&self, name: &PluginName, binary: &str, cfg: &PluginLaunchConfig) -> PulseResult<PluginEndpoint> {
        let port = self.allocate_port();
        let mut command = tokio::process::Command::new(binary);
        command.args(&cfg.args).arg("--port").arg(port.to_string());
        for (key, value) in &cfg.env {
            command.env(key, value);
        }
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| PulseError::service_unavailable(format!("failed to spawn plugin `{name}`: {e}")))?;
        let pid = child.id().ok_or_else(|| PulseError::internal(format!("plugin `{name}` exited before reporting a pid")))?;

        let reaper_name = name.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(plugin = %reaper_name, %status, "plugin process exited"),
                Err(e) => warn!(plugin = %reaper_name, error = %e, "failed to wait on plugin process"),
            }
        });

        info!(plugin = %name, pid, port, "plugin spawned");
        Ok(PluginEndpoint::ChildProcess { pid, port })
    }

    fn parse_address(address: &str) -> PulseResult<PluginEndpoint> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| PulseError::invalid_request(format!("plugin address `{address}` is not host:port")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| PulseError::invalid_request(format!("plugin address `{address}` has an invalid port")))?;
        Ok(PluginEndpoint::Address { host: host.to_string(), port })
    }

    async fn wait_for_readiness(&self, endpoint: &PluginEndpoint, deadline: Duration) -> PulseResult<()> {
        let addr = socket_addr(endpoint);
        let deadline_at = tokio::time::Instant::now() + deadline;
        loop {
            match TcpStream::connect(&addr).await {
                Ok(_) => return Ok(()),
                Err(_) if tokio::time::Instant::now() < deadline_at => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => {
                    return Err(PulseError::new(
                        ErrorKind::Timeout,
                        format!("plugin at {addr} did not become ready within {deadline:?}: {e}"),
                    ))
                }
            }
        }
    }

    fn ensure_usable(&self, name: &PluginName) -> PulseResult<()> {
        let records = self.records.lock();
        let record = records.get(name).ok_or_else(|| PulseError::not_found(format!("plugin `{name}` not found")))?;
        match record.state {
            PluginState::Running => {}
            PluginState::Paused => {
                return Err(PulseError::service_unavailable(format!("plugin `{name}` is paused")))
            }
            other => return Err(PulseError::service_unavailable(format!("plugin `{name}` is {other}"))),
        }
        if record.health.consecutive_failures >= UNHEALTHY_THRESHOLD {
            return Err(PulseError::new(ErrorKind::PluginUnhealthy, format!("plugin `{name}` is unhealthy")));
        }
        Ok(())
    }

    pub fn pause(&self, name: &PluginName) -> PulseResult<()> {
        self.transition(name, PluginState::Running, PluginState::Paused)
    }

    pub fn resume(&self, name: &PluginName) -> PulseResult<()> {
        self.transition(name, PluginState::Paused, PluginState::Running)
    }

    fn transition(&self, name: &PluginName, from: PluginState, to: PluginState) -> PulseResult<()> {
        let mut records = self.records.lock();
        let record = records.get_mut(name).ok_or_else(|| PulseError::not_found(format!("plugin `{name}` not found")))?;
        if record.state != from {
            let current = record.state;
            return Err(PulseError::conflict(format!("plugin `{name}` is {current}, expected {from}")));
        }
        record.state = to;
        Ok(())
    }

    /// Invokes a registered plugin command (`ExecuteCommand`).
    pub async fn execute_command(&self, name: &PluginName, invocation: CommandInvocation) -> PulseResult<CommandResult> {
        self.ensure_usable(name)?;
        let endpoint = self.endpoint_of(name)?;
        match call_with_timeout(&endpoint, PluginCall::ExecuteCommand(invocation), RPC_TIMEOUT).await? {
            PluginReply::ExecuteCommand(result) => Ok(result),
            PluginReply::Error { message } => Err(PulseError::new(ErrorKind::Internal, message)),
            other => Err(PulseError::internal(format!("unexpected reply to ExecuteCommand: {other:?}"))),
        }
    }

    /// Forwards an HTTP request through the plugin's RPC (HTTP proxying): path includes the
    /// query string, headers are already flattened to a map (last value wins), body is raw
    /// bytes.
    pub async fn handle_http(&self, name: &PluginName, request: HttpRequest) -> PulseResult<HttpResponse> {
        self.ensure_usable(name)?;
        let endpoint = self.endpoint_of(name)?;
        match call_with_timeout(&endpoint, PluginCall::HandleHttp(request), HTTP_PROXY_TIMEOUT).await? {
            PluginReply::HandleHttp(response) => Ok(response),
            PluginReply::Error { message } => Err(PulseError::new(ErrorKind::Internal, message)),
            other => Err(PulseError::internal(format!("unexpected reply to HandleHttp: {other:?}"))),
        }
    }

    /// Resolves the plugin's WebSocket URL for bidirectional proxying
    /// (WebSocket proxying): the same host/port as its RPC endpoint, since a plugin serves
    /// both surfaces on one listener.
    pub fn ws_endpoint(&self, name: &PluginName) -> PulseResult<String> {
        let (host, port) = match self.endpoint_of(name)? {
            PluginEndpoint::ChildProcess { port, .. } => ("127.0.0.1".to_string(), port),
            PluginEndpoint::Address { host, port } => (host, port),
        };
        Ok(format!("ws://{host}:{port}/ws"))
    }

    /// One health probe: three consecutive failures mark unhealthy; a success
    /// after any unhealthy probe flips back to healthy. Both transitions broadcast
    /// `plugin_health`.
    pub async fn probe_health(&self, name: &PluginName) -> PulseResult<PluginHealth> {
        let endpoint = self.endpoint_of(name)?;
        let probe = call_with_timeout(&endpoint, PluginCall::Health, Duration::from_secs(5)).await;

        let mut records = self.records.lock();
        let record = records.get_mut(name).ok_or_else(|| PulseError::not_found(format!("plugin `{name}` not found")))?;
        let was_unhealthy = record.health.consecutive_failures >= UNHEALTHY_THRESHOLD;

        match probe {
            Ok(PluginReply::Health(check)) if check.healthy => {
                record.health =
                    PluginHealth { healthy: true, message: check.message, details: check.details, consecutive_failures: 0 };
            }
            Ok(PluginReply::Health(check)) => {
                record.health.consecutive_failures += 1;
                record.health.healthy = false;
                record.health.message = check.message;
                record.health.details = check.details;
            }
            _ => {
                record.health.consecutive_failures += 1;
                record.health.healthy = false;
                record.health.message = Some("health probe failed".to_string());
            }
        }

        let health = record.health.clone();
        let state = record.state.to_string();
        let now_unhealthy = health.consecutive_failures >= UNHEALTHY_THRESHOLD;
        drop(records);

        if now_unhealthy && !was_unhealthy {
            warn!(plugin = %name, "plugin marked unhealthy");
            self.sink.emit(Event::PluginHealth {
                plugin: name.to_string(),
                healthy: false,
                state,
                message: health.message.clone(),
            });
        } else if !now_unhealthy && was_unhealthy {
            info!(plugin = %name, "plugin recovered");
            self.sink.emit(Event::PluginHealth { plugin: name.to_string(), healthy: true, state, message: None });
        }

        Ok(health)
    }

    /// `Shutdown(deadline)`: requests a graceful exit, then sends
    /// OS-level termination if the process is still alive once the
    /// deadline elapses. Polls rather than blocking for the full deadline so a
    /// plugin that exits promptly doesn't stall a restart.
    pub async fn shutdown(&self, name: &PluginName, deadline: Duration) -> PulseResult<()> {
        self.upsert_state(name, PluginState::Stopping);
        let endpoint = self.endpoint_of(name);

        if let Ok(endpoint) = &endpoint {
            let deadline_ms = deadline.as_millis() as u64;
            if let Err(e) = call_with_timeout(endpoint, PluginCall::Shutdown { deadline_ms }, deadline).await {
                debug!(plugin = %name, error = %e, "plugin did not acknowledge shutdown request");
            }
        }

        if let Ok(PluginEndpoint::ChildProcess { pid, .. }) = endpoint {
            let deadline_at = tokio::time::Instant::now() + deadline;
            while Self::process_alive(pid) && tokio::time::Instant::now() < deadline_at {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if Self::process_alive(pid) {
                warn!(plugin = %name, pid, "plugin still running past shutdown deadline, sending SIGKILL");
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
        }

        self.upsert_state(name, PluginState::Stopped);
        Ok(())
    }

    fn process_alive(pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    pub fn commands_for(&self, name: &PluginName) -> Vec<CommandDef> {
        self.records.lock().get(name).map(|r| r.commands.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
