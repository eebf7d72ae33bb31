// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown sequencing. Signal handling is grounded on `rustpress-server::shutdown`'s
//! SIGINT/SIGTERM listener, adapted to a `tokio_util::CancellationToken` for consistency with
//! the scheduler/dispatcher/health-prober shutdown plumbing, which already use that primitive
//! throughout this crate.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Resolves once SIGINT or SIGTERM is received (SIGTERM only on Unix).
pub async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => std::future::pending().await,
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Cancels the root token and waits (up to `grace_period`) for the
/// dispatcher to drain in-flight Jobs, then instructs every plugin to
/// shut down. Returns once shutdown is complete or the grace period elapses, whichever comes
/// first.
pub async fn drain(
    shutdown: CancellationToken,
    state: &crate::state::AppState,
    handles: crate::startup::Handles,
    grace_period: std::time::Duration,
) {
    shutdown.cancel();
    info!("shutdown initiated: draining in-flight jobs");

    let drain = async {
        for worker in handles.workers {
            let _ = worker.await;
        }
        let _ = handles.tick_loop.await;
        for prober in handles.health_probers {
            let _ = prober.await;
        }
        let _ = handles.snapshot_task.await;
    };
    if tokio::time::timeout(grace_period, drain).await.is_err() {
        tracing::warn!("shutdown grace period elapsed before all tasks drained");
    }

    for record in state.plugins.list() {
        if let Err(e) = state.plugins.shutdown(&record.name, grace_period).await {
            tracing::warn!(plugin = %record.name, error = %e, "plugin did not shut down cleanly");
        }
    }

    crate::startup::broadcast_shutdown(state);
    info!("shutdown complete");
}
