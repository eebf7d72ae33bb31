// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

async fn echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut tx, mut rx) = ws.split();
        while let Some(Ok(msg)) = rx.next().await {
            match msg {
                Message::Text(_) | Message::Binary(_) => {
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => continue,
            }
        }
    });
    format!("ws://127.0.0.1:{port}")
}

#[tokio::test]
async fn relay_echoes_text_frames_both_directions() {
    let url = echo_server().await;
    let (from_client_tx, from_client_rx) = mpsc::channel(4);
    let (to_client_tx, mut to_client_rx) = mpsc::channel(4);

    let handle = tokio::spawn(relay(&url, from_client_rx, to_client_tx));

    from_client_tx.send(RelayFrame::Text("hello".into())).await.unwrap();
    let echoed = to_client_rx.recv().await.unwrap();
    match echoed {
        RelayFrame::Text(text) => assert_eq!(text, "hello"),
        other => panic!("unexpected frame: {other:?}"),
    }

    drop(from_client_tx);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn relay_returns_service_unavailable_when_the_plugin_is_unreachable() {
    let from_client_rx = mpsc::channel(1).1;
    let (to_client_tx, _to_client_rx) = mpsc::channel(1);
    let result = relay("ws://127.0.0.1:1", from_client_rx, to_client_tx).await;
    assert_eq!(result.unwrap_err().kind, ErrorKind::ServiceUnavailable);
}
