// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC proxy: one call-and-reply exchange over the plugin's TCP control
//! connection using `pulse_wire`'s length-prefixed JSON framing
//! (contract per plugin).

use pulse_core::{ErrorKind, PluginEndpoint, PulseError, PulseResult};
use pulse_wire::{read_message, write_message, PluginCall, PluginReply};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

pub(crate) fn socket_addr(endpoint: &PluginEndpoint) -> String {
    match endpoint {
        PluginEndpoint::ChildProcess { port, .. } => format!("127.0.0.1:{port}"),
        PluginEndpoint::Address { host, port } => format!("{host}:{port}"),
    }
}

async fn call_inner(addr: &str, request: &PluginCall) -> PulseResult<PluginReply> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| PulseError::new(ErrorKind::Retryable, format!("connect to plugin at {addr} failed: {e}")))?;

    let payload = serde_json::to_vec(request)
        .map_err(|e| PulseError::internal(format!("failed to encode plugin call: {e}")))?;
    write_message(&mut stream, &payload)
        .await
        .map_err(|e| PulseError::new(ErrorKind::Retryable, format!("write to plugin at {addr} failed: {e}")))?;

    let response = read_message(&mut stream)
        .await
        .map_err(|e| PulseError::new(ErrorKind::Retryable, format!("read from plugin at {addr} failed: {e}")))?;

    serde_json::from_slice::<PluginReply>(&response)
        .map_err(|e| PulseError::internal(format!("failed to decode plugin reply: {e}")))
}

/// One RPC call, bounded by `timeout` ("outbound RPC to a plugin" is a suspension point, never
/// held across a lock).
pub async fn call_with_timeout(
    endpoint: &PluginEndpoint,
    request: PluginCall,
    timeout: Duration,
) -> PulseResult<PluginReply> {
    let addr = socket_addr(endpoint);
    tokio::time::timeout(timeout, call_inner(&addr, &request))
        .await
        .map_err(|_| PulseError::new(ErrorKind::Timeout, format!("RPC to plugin at {addr} timed out after {timeout:?}")))?
}

/// As [`call_with_timeout`], but also aborts if `cancel` fires first
/// ("the RPC layer must abort the in-flight call when its context is cancelled").
pub async fn call_cancellable(
    endpoint: &PluginEndpoint,
    request: PluginCall,
    timeout: Duration,
    cancel: &CancellationToken,
) -> PulseResult<PluginReply> {
    tokio::select! {
        result = call_with_timeout(endpoint, request, timeout) => result,
        _ = cancel.cancelled() => Err(PulseError::new(ErrorKind::Retryable, "plugin RPC cancelled")),
    }
}

#[cfg(test)]
#[path = "rpc_client_tests.rs"]
mod tests;
