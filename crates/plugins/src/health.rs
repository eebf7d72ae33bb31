// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived health probe task, one per plugin (Health probe, "the scheduler tick,
//! broadcaster, and plugin health probes are long-lived tasks").

use crate::manager::PluginManager;
use pulse_core::PluginName;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Spawns the periodic prober for one plugin. Stops cleanly when
/// `cancel` fires (shutdown sequencing).
pub fn spawn_health_prober(
    manager: Arc<PluginManager>,
    name: PluginName,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = manager.probe_health(&name).await {
                        debug!(plugin = %name, error = %e, "health probe failed to run");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
