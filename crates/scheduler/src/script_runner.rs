// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ScriptRunnerExecutor: the generic handler that lets attestations
//! whose predicate is `ix_handler` become executable without core
//! changes ("script stored as data"). The engine never interprets the script body itself; it
//! is handed verbatim to the configured scripting plugin through the standard RPC surface.

use async_trait::async_trait;
use pulse_core::{ErrorKind, ExecContext, ExecOutcome, OperationType, PluginName, PulseError, PulseResult};
use pulse_plugins::PluginManager;
use pulse_store::AttestationStore;
use pulse_wire::CommandInvocation;
use std::sync::Arc;

/// Forwards an `ix_handler` attestation's script body to a plugin
/// ("Special executor"). The Job payload carries the attestation id as UTF-8 bytes (see the
/// scheduler tick); this executor is registered once per handler name and is stateless across
/// invocations.
pub struct ScriptRunnerExecutor {
    store: Arc<dyn AttestationStore>,
    plugins: Arc<PluginManager>,
    scripting_plugin: PluginName,
}

impl ScriptRunnerExecutor {
    pub fn new(store: Arc<dyn AttestationStore>, plugins: Arc<PluginManager>, scripting_plugin: PluginName) -> Arc<Self> {
        Arc::new(Self { store, plugins, scripting_plugin })
    }
}

#[async_trait]
impl pulse_core::Executor for ScriptRunnerExecutor {
    async fn execute(&self, payload: &[u8], _ctx: &ExecContext) -> PulseResult<ExecOutcome> {
        let id_str = std::str::from_utf8(payload)
            .map_err(|_| PulseError::invalid_request("script-runner payload is not a valid attestation id"))?;
        let attestation_id = pulse_core::AttestationId::from_string(id_str);

        let attestation = self
            .store
            .get(attestation_id)
            .await
            .ok_or_else(|| PulseError::not_found(format!("attestation {attestation_id} not found")))?;

        let script = attestation
            .handler_script()
            .ok_or_else(|| PulseError::invalid_request(format!("attestation {attestation_id} has no ix_handler script")))?
            .to_string();

        let invocation = CommandInvocation { name: "run_script".to_string(), args: vec![script], flags: Default::default() };
        let result = self.plugins.execute_command(&self.scripting_plugin, invocation).await?;

        if result.exit_code != 0 {
            return Err(PulseError::new(
                ErrorKind::Internal,
                format!("script for attestation {attestation_id} exited with status {}", result.exit_code),
            )
            .with_detail(result.stderr));
        }

        Ok(ExecOutcome {
            result: Some(serde_json::json!({ "stdout": result.stdout })),
            cost_usd: None,
            model_name: None,
            model_provider: None,
            prompt_tokens: None,
            completion_tokens: None,
        })
    }
}

/// Operation type recorded for script-runner invocations, exported so
/// callers that build `UsageRecord`s by hand can stay consistent with
/// what this executor implies.
pub const SCRIPT_RUN_OPERATION: OperationType = OperationType::ScriptRun;

#[cfg(test)]
#[path = "script_runner_tests.rs"]
mod tests;
