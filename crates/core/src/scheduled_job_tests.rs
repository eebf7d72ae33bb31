// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn schedule(ats_code: &str) -> ScheduledJob {
    ScheduledJob {
        id: ScheduledJobId::new(),
        ats_code: ats_code.into(),
        interval_seconds: 3600,
        state: ScheduledJobState::Active,
        next_run_at_ms: 0,
        origin: None,
        created_at_ms: 0,
        inflight_count: 0,
    }
}

#[test]
fn derived_handler_name_takes_last_token() {
    assert_eq!(schedule("ix webhook").derived_handler_name(), "webhook");
    assert_eq!(schedule("webhook").derived_handler_name(), "webhook");
}

#[test]
fn state_display_is_snake_case() {
    assert_eq!(ScheduledJobState::Active.to_string(), "active");
    assert_eq!(ScheduledJobState::Paused.to_string(), "paused");
    assert_eq!(ScheduledJobState::Inactive.to_string(), "inactive");
}
