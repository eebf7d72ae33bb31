// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn key() -> BucketKey {
    BucketKey { actor: "u".into(), context: "c".into() }
}

#[test]
fn unbounded_bucket_never_warns() {
    let mut tracker = BucketTracker::new(BucketLimits { default_limit: 0 });
    for _ in 0..100 {
        let (warning, over) = tracker.record_insert(&key());
        assert!(warning.is_none());
        assert!(!over);
    }
}

#[test]
fn warns_once_at_fifty_percent() {
    let mut tracker = BucketTracker::new(BucketLimits { default_limit: 10 });
    let mut warnings = 0;
    for _ in 0..10 {
        let (warning, _over) = tracker.record_insert(&key());
        if warning.is_some() {
            warnings += 1;
        }
    }
    assert_eq!(warnings, 1, "warning should fire exactly once crossing the threshold");
}

#[test]
fn over_limit_after_exceeding() {
    let mut tracker = BucketTracker::new(BucketLimits { default_limit: 3 });
    let mut saw_over = false;
    for _ in 0..5 {
        let (_warning, over) = tracker.record_insert(&key());
        saw_over |= over;
    }
    assert!(saw_over);
}

#[test]
fn eviction_brings_current_back_within_limit() {
    let mut tracker = BucketTracker::new(BucketLimits { default_limit: 3 });
    for _ in 0..4 {
        tracker.record_insert(&key());
    }
    assert_eq!(tracker.current(&key()), 4);
    let event = tracker.record_eviction(&key());
    match event {
        BucketEvent::Eviction { current, limit, .. } => {
            assert!(current <= limit);
        }
        _ => panic!("expected eviction event"),
    }
    assert_eq!(tracker.current(&key()), 3);
}

#[test]
fn fill_percent_is_none_when_unbounded() {
    let tracker = BucketTracker::new(BucketLimits { default_limit: 0 });
    assert_eq!(tracker.fill_percent(&key()), None);
}
