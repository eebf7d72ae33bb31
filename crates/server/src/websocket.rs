// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws`: bridges one `axum::WebSocket` connection to a `pulse_broadcast::Subscription`.
//! Grounded on `rustpress-server::websocket::handler`'s `WebSocketUpgrade` + split
//! sender/receiver shape, minus the JWT auth layer (names authentication as an out-of-scope
//! external collaborator).

use crate::routes::{budget_window_views, system_capability_flags};
use crate::state::{AppState, PROTOCOL_VERSION};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use pulse_core::{Event, PulseDaemonAction};
use tracing::debug;

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut subscription = state.broadcaster.subscribe();
    let subscriber_id = subscription.id();
    let (mut sink, mut stream) = socket.split();

    if send_event(&mut sink, &Event::Version { build: crate::state::build_info(), protocol: PROTOCOL_VERSION }).await.is_err() {
        state.broadcaster.close(subscriber_id);
        return;
    }
    let _ = send_event(&mut sink, &Event::SystemCapabilities { flags: system_capability_flags() }).await;
    let _ = send_event(
        &mut sink,
        &Event::DaemonStatus { running: true, active_jobs: state.active_jobs(), budget: budget_window_views(&state) },
    )
    .await;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => handle_client_frame(&state, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.broadcaster.close(subscriber_id);
}

/// Every client-sent frame with an unrecognized `type` deserializes to
/// `Event::Custom` and is ignored ("Unknown types MUST be ignored by both sides").
async fn handle_client_frame(state: &AppState, text: &str) {
    let Ok(event) = serde_json::from_str::<Event>(text) else {
        debug!("ignoring malformed websocket frame");
        return;
    };
    match event {
        Event::Query { text, cursor } => {
            // The ATS query text is routed to an external query executor
            // this core does not itself implement; acknowledged here only at the protocol
            // level.
            debug!(cursor, len = text.len(), "received client query frame");
        }
        Event::PulseDaemonControl { action } => {
            let running = matches!(action, PulseDaemonAction::Start);
            debug!(running, "received pulse daemon control frame");
            state.broadcaster.publish(Event::DaemonStatus {
                running,
                active_jobs: state.active_jobs(),
                budget: budget_window_views(state),
            });
        }
        _ => {}
    }
}

async fn send_event(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &Event,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap_or_default();
    sink.send(Message::Text(text)).await
}
