// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket proxying: "specified as a bidirectional stream capability; an implementation MAY
//! declare it unimplemented... If implemented, the core accepts the upgrade, opens a stream to
//! the plugin, and relays frames in both directions until either side closes." Per Open
//! Question resolution #3, this core implements it rather than declaring it unsupported.
//!
//! Decoupled from the server's websocket library (axum) via a small channel-based
//! [`RelayFrame`] so this crate doesn't need to depend on axum; `pulse-server` bridges the
//! client-facing `axum::ws::WebSocket` to the `mpsc` channels this function drives, grounded
//! in the rustpress hub's per-connection relay shape.

use futures_util::{SinkExt, StreamExt};
use pulse_core::{ErrorKind, PulseError, PulseResult};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub enum RelayFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Connects to the plugin's WebSocket endpoint and relays frames in
/// both directions until either side closes (WebSocket proxying).
pub async fn relay(
    plugin_ws_url: &str,
    mut from_client: mpsc::Receiver<RelayFrame>,
    to_client: mpsc::Sender<RelayFrame>,
) -> PulseResult<()> {
    let (stream, _response) = tokio_tungstenite::connect_async(plugin_ws_url)
        .await
        .map_err(|e| PulseError::new(ErrorKind::ServiceUnavailable, format!("failed to connect to plugin websocket: {e}")))?;
    let (mut plugin_tx, mut plugin_rx) = stream.split();

    loop {
        tokio::select! {
            from_core = from_client.recv() => {
                match from_core {
                    Some(RelayFrame::Text(text)) => {
                        if plugin_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(RelayFrame::Binary(bytes)) => {
                        if plugin_tx.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = plugin_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            from_plugin = plugin_rx.next() => {
                match from_plugin {
                    Some(Ok(Message::Text(text))) => {
                        if to_client.send(RelayFrame::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        if to_client.send(RelayFrame::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "ws_relay_tests.rs"]
mod tests;
