// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_job_starts_queued() {
    let job = Job::new("webhook", vec![1, 2, 3], 100);
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.attempt, 0);
    assert!(job.started_at_ms.is_none());
}

#[test]
fn legal_transitions_succeed() {
    let mut job = Job::new("webhook", vec![], 0);
    job.transition(JobState::Running, 10).unwrap();
    assert_eq!(job.started_at_ms, Some(10));
    job.transition(JobState::Succeeded, 20).unwrap();
    assert_eq!(job.finished_at_ms, Some(20));
    assert!(job.state.is_terminal());
}

#[test]
fn illegal_transition_is_rejected() {
    let mut job = Job::new("webhook", vec![], 0);
    let err = job.transition(JobState::Succeeded, 10).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(job.state, JobState::Queued);
}

#[test]
fn terminal_states_reject_further_transitions() {
    let mut job = Job::new("webhook", vec![], 0);
    job.transition(JobState::Running, 1).unwrap();
    job.transition(JobState::Cancelled, 2).unwrap();
    assert!(job.transition(JobState::Running, 3).is_err());
}

#[test]
fn fail_records_error_details() {
    let mut job = Job::new("webhook", vec![], 0);
    job.transition(JobState::Running, 1).unwrap();
    let err = PulseError::new(ErrorKind::Timeout, "deadline exceeded").with_detail("attempt 3");
    job.fail(&err, 2).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(job.error_details, vec!["attempt 3".to_string()]);
}

#[test]
fn payload_round_trips_through_json() {
    let job = Job::new("webhook", vec![0, 255, 16], 0);
    let json = serde_json::to_string(&job).unwrap();
    let back: Job = serde_json::from_str(&json).unwrap();
    assert_eq!(back.payload, vec![0, 255, 16]);
}
