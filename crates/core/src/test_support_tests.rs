// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn job_builder_applies_overrides() {
    let job = Job::builder().handler("webhook").attempt(2).build();
    assert_eq!(job.handler, "webhook");
    assert_eq!(job.attempt, 2);
    assert_eq!(job.state, JobState::Queued);
}

#[test]
fn scheduled_job_builder_defaults_are_sane() {
    let sched = ScheduledJob::builder().build();
    assert_eq!(sched.interval_seconds, 3600);
    assert_eq!(sched.state, ScheduledJobState::Active);
}

#[test]
fn attestation_builder_builds_with_overrides() {
    let a = Attestation::builder().subjects(vec!["s1".to_string()]).timestamp_ms(42).build();
    assert_eq!(a.subjects, vec!["s1".to_string()]);
    assert_eq!(a.timestamp_ms, 42);
}
