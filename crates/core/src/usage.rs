// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UsageRecord: one append-only entry per finished LLM/plugin call.

use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct UsageRecordId("use-");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    LlmCompletion,
    PluginCommand,
    PluginHttp,
    ScriptRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: UsageRecordId,
    pub operation_type: OperationType,
    pub entity_type: String,
    pub entity_id: String,
    pub model_name: Option<String>,
    pub model_provider: Option<String>,
    pub request_at_ms: u64,
    pub response_at_ms: u64,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub cost_usd: f64,
    pub success: bool,
    pub error_message: Option<String>,
}

#[cfg(test)]
#[path = "usage_tests.rs"]
mod tests;
