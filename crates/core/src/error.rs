// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-cutting error taxonomy shared by every component contract.
//!
//! Every public operation in the engine returns `Result<T, PulseError>`.
//! `ErrorKind` is the wire-stable category; `details` is an ordered list
//! of structured strings that is preserved across layer boundaries and
//! across the WebSocket/HTTP surface (see).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed taxonomy of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Conflict,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    Timeout,
    BudgetExhausted,
    HandlerNotRegistered,
    PluginUnhealthy,
    /// Transient network/timeout/transport signal; the only kind the
    /// dispatcher retries.
    Retryable,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        InvalidRequest => "invalid_request",
        NotFound => "not_found",
        Conflict => "conflict",
        Unauthorized => "unauthorized",
        Forbidden => "forbidden",
        ServiceUnavailable => "service_unavailable",
        Timeout => "timeout",
        BudgetExhausted => "budget_exhausted",
        HandlerNotRegistered => "handler_not_registered",
        PluginUnhealthy => "plugin_unhealthy",
        Retryable => "retryable",
        Internal => "internal",
    }
}

impl ErrorKind {
    /// HTTP status code this kind maps to.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::Timeout => 504,
            ErrorKind::BudgetExhausted => 402,
            ErrorKind::HandlerNotRegistered => 404,
            ErrorKind::PluginUnhealthy => 503,
            ErrorKind::Retryable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Only `Retryable` errors are eligible for the dispatcher's retry loop.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Retryable)
    }
}

/// A structured, cross-layer error carrying a short user message, a
/// category tag, and an ordered detail list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl PulseError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), details: Vec::new() }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_details(mut self, details: impl IntoIterator<Item = String>) -> Self {
        self.details.extend(details);
        self
    }

    /// Wrap with additional layer context, preserving kind and details.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.details.insert(0, std::mem::replace(&mut self.message, context));
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PulseError {}

pub type PulseResult<T> = Result<T, PulseError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
