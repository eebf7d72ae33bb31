// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /api/:plugin/ws` (WebSocket proxying, Open Question resolution #3): bridges a client
//! `axum::WebSocket` to the plugin's own WebSocket endpoint via `pulse_plugins::relay`, the
//! way `plugin_proxy::proxy` bridges HTTP.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use pulse_core::PluginName;
use pulse_plugins::RelayFrame;
use tokio::sync::mpsc;

const RELAY_CHANNEL_CAPACITY: usize = 64;

pub async fn ws_proxy(
    State(state): State<AppState>,
    Path(plugin): Path<String>,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let name = PluginName::from(plugin.as_str());
    let plugin_ws_url = state.plugins.ws_endpoint(&name).map_err(ApiError::from)?;
    Ok(ws.on_upgrade(move |socket| bridge(socket, plugin_ws_url)))
}

async fn bridge(socket: WebSocket, plugin_ws_url: String) {
    let (to_plugin_tx, to_plugin_rx) = mpsc::channel::<RelayFrame>(RELAY_CHANNEL_CAPACITY);
    let (from_plugin_tx, mut from_plugin_rx) = mpsc::channel::<RelayFrame>(RELAY_CHANNEL_CAPACITY);

    let relay_task = tokio::spawn(async move {
        if let Err(e) = pulse_plugins::relay(&plugin_ws_url, to_plugin_rx, from_plugin_tx).await {
            tracing::warn!(error = %e, "plugin websocket relay ended with an error");
        }
    });

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = from_plugin_rx.recv() => {
                match frame {
                    Some(RelayFrame::Text(text)) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(RelayFrame::Binary(bytes)) => {
                        if sink.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if to_plugin_tx.send(RelayFrame::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        if to_plugin_tx.send(RelayFrame::Binary(bytes)).await.is_err() {
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

    drop(to_plugin_tx);
    relay_task.abort();
}
