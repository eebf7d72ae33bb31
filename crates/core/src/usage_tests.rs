// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn usage_record_serializes_operation_type_snake_case() {
    let record = UsageRecord {
        id: UsageRecordId::new(),
        operation_type: OperationType::LlmCompletion,
        entity_type: "job".into(),
        entity_id: "job-1".into(),
        model_name: Some("claude".into()),
        model_provider: Some("anthropic".into()),
        request_at_ms: 0,
        response_at_ms: 10,
        prompt_tokens: Some(100),
        completion_tokens: Some(50),
        cost_usd: 0.0015,
        success: true,
        error_message: None,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["operation_type"], "llm_completion");
}
