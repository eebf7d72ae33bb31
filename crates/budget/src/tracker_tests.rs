// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pulse_core::{OperationType, UsageRecordId};

fn sample_record() -> UsageRecord {
    UsageRecord {
        id: UsageRecordId::new(),
        operation_type: OperationType::LlmCompletion,
        entity_type: "job".into(),
        entity_id: "job-1".into(),
        model_name: Some("claude-sonnet".into()),
        model_provider: Some("anthropic".into()),
        request_at_ms: 0,
        response_at_ms: 1,
        prompt_tokens: Some(10),
        completion_tokens: Some(20),
        cost_usd: 0.01,
        success: true,
        error_message: None,
    }
}

#[test]
fn records_accumulate_append_only() {
    let tracker = UsageTracker::new();
    tracker.record(sample_record());
    tracker.record(sample_record());
    assert_eq!(tracker.len(), 2);
    assert_eq!(tracker.all().len(), 2);
}

#[test]
fn empty_tracker_reports_empty() {
    let tracker = UsageTracker::new();
    assert!(tracker.is_empty());
}
