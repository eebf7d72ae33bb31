// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job: a materialized execution instance.

use crate::error::{ErrorKind, PulseError};
use crate::scheduled_job::ScheduledJobId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a Job (one materialized execution instance).
    pub struct JobId("job-");
}

/// Job state machine: `queued -> running -> {succeeded | failed | cancelled}`. Terminal states
/// never revert (invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }

    /// Whether `self -> next` is a legal transition (state machine).
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Queued, Failed)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

/// One materialized unit of work dispatched to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub handler: String,
    #[serde(with = "serde_bytes_as_base64")]
    pub payload: Vec<u8>,
    pub state: JobState,
    pub attempt: u32,
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub error_details: Vec<String>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
    pub parent_scheduled_job: Option<ScheduledJobId>,
}

impl Job {
    pub fn new(handler: impl Into<String>, payload: Vec<u8>, now_ms: u64) -> Self {
        Self {
            id: JobId::new(),
            handler: handler.into(),
            payload,
            state: JobState::Queued,
            attempt: 0,
            error_message: None,
            error_kind: None,
            error_details: Vec::new(),
            created_at_ms: now_ms,
            started_at_ms: None,
            finished_at_ms: None,
            parent_scheduled_job: None,
        }
    }

    /// Apply a state transition, enforcing monotonicity (invariant). Returns `Internal` if the
    /// transition is illegal; this should never be reachable from the dispatcher's own code
    /// paths and indicates a bug if it is.
    pub fn transition(&mut self, next: JobState, now_ms: u64) -> Result<(), PulseError> {
        if !self.state.can_transition_to(next) {
            return Err(PulseError::internal(format!(
                "illegal job transition {} -> {}",
                self.state, next
            )));
        }
        if next == JobState::Running {
            self.started_at_ms = Some(now_ms);
        }
        if next.is_terminal() {
            self.finished_at_ms = Some(now_ms);
        }
        self.state = next;
        Ok(())
    }

    pub fn fail(&mut self, err: &PulseError, now_ms: u64) -> Result<(), PulseError> {
        self.error_message = Some(err.message.clone());
        self.error_kind = Some(err.kind);
        self.error_details = err.details.clone();
        self.transition(JobState::Failed, now_ms)
    }
}

mod serde_bytes_as_base64 {
    //! Payload bytes are opaque to the engine; encode as a base64 string so the Job DTO
    //! round-trips cleanly through JSON.
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(bytes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        use base64::Engine;
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
