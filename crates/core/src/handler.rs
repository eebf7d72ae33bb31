// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HandlerBinding: handler name -> executor capability.

use crate::error::PulseResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution context passed to every handler invocation (step 3, cancellation/timeouts).
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub job_id: crate::job::JobId,
    pub attempt: u32,
    pub deadline: Duration,
    pub cancel: tokio_util::sync::CancellationToken,
}

/// Outcome of a successful handler invocation: usage accounting data plus
/// an opaque result payload (step 4, UsageRecord).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub result: Option<serde_json::Value>,
    /// Cost in USD to record against the budget ledger, if this
    /// invocation consumed a billable resource.
    pub cost_usd: Option<f64>,
    pub model_name: Option<String>,
    pub model_provider: Option<String>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// A named executor capability, resolved by the handler registry and
/// invoked by a dispatcher worker.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, payload: &[u8], ctx: &ExecContext) -> PulseResult<ExecOutcome>;

    /// Optional per-handler override of the default job timeout
    /// (step 3).
    fn timeout_override(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
