// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pulsed`: the Pulse node binary. Installs the global `tracing` subscriber, builds the
//! composition root, serves the HTTP/WS surface, and drains on SIGINT/SIGTERM.

use pulse_server::{routes, shutdown, startup};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let node = match startup::start().await {
        Ok(node) => node,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let port = node.state.config_snapshot().server.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "pulsed listening");

    let router = routes::create_router(node.state.clone());
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "http server exited with an error");
        }
    });

    shutdown::wait_for_signal().await;
    server.abort();

    shutdown::drain(node.state.shutdown.clone(), &node.state, node.handles, startup::SHUTDOWN_GRACE_PERIOD).await;

    std::process::exit(0);
}
