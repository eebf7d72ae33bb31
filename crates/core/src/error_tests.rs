// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn http_status_mapping_matches_spec_table() {
    assert_eq!(ErrorKind::InvalidRequest.http_status(), 400);
    assert_eq!(ErrorKind::NotFound.http_status(), 404);
    assert_eq!(ErrorKind::Conflict.http_status(), 409);
    assert_eq!(ErrorKind::ServiceUnavailable.http_status(), 503);
    assert_eq!(ErrorKind::Timeout.http_status(), 504);
    assert_eq!(ErrorKind::Internal.http_status(), 500);
}

#[test]
fn only_retryable_is_retryable() {
    assert!(ErrorKind::Retryable.is_retryable());
    assert!(!ErrorKind::Timeout.is_retryable());
    assert!(!ErrorKind::Internal.is_retryable());
}

#[test]
fn context_preserves_original_message_as_detail() {
    let err = PulseError::not_found("job xyz").context("dispatch failed");
    assert_eq!(err.message, "dispatch failed");
    assert_eq!(err.details, vec!["job xyz".to_string()]);
}

#[test]
fn with_detail_appends_in_order() {
    let err = PulseError::internal("boom").with_detail("a").with_detail("b");
    assert_eq!(err.details, vec!["a".to_string(), "b".to_string()]);
}
