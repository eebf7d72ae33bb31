// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pulse-broadcast: one-to-many fan-out of [`Event`]s to WebSocket
//! clients. Per-subscriber buffers are bounded; a full buffer drops its oldest undelivered
//! event rather than blocking the publisher or the other subscribers.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use parking_lot::Mutex;
use pulse_core::{Event, EventSink, SubscriberId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

struct SubscriberState {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl SubscriberState {
    fn push(&self, event: Event) {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            // Per-subscriber head-drop: the oldest undelivered event is
            // discarded so the publisher and other subscribers never
            // block on one slow reader (`Publish`).
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }
}

/// One-to-many fan-out broadcaster.
pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriberId, Arc<SubscriberState>>>,
    buffer_capacity: usize,
}

impl Broadcaster {
    pub fn new(buffer_capacity: usize) -> Arc<Self> {
        Arc::new(Self { subscribers: Mutex::new(HashMap::new()), buffer_capacity })
    }

    /// Registers a new subscriber and returns its handle (`Subscribe`).
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new();
        let state = Arc::new(SubscriberState {
            queue: Mutex::new(VecDeque::new()),
            capacity: self.buffer_capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        self.subscribers.lock().insert(id, state.clone());
        Subscription { id, state }
    }

    /// Copies `event` into every subscriber's buffer. The subscriber set
    /// lock is released before any buffer is touched, so no lock ever
    /// spans an outbound send.
    pub fn publish(&self, event: Event) {
        let targets: Vec<Arc<SubscriberState>> = self.subscribers.lock().values().cloned().collect();
        for state in targets {
            state.push(event.clone());
        }
    }

    /// Removes a subscriber and releases its buffer (`Close`).
    pub fn close(&self, id: SubscriberId) {
        if let Some(state) = self.subscribers.lock().remove(&id) {
            state.closed.store(true, Ordering::SeqCst);
            state.notify.notify_one();
            debug!(%id, "broadcaster subscriber closed");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Lets components that only need to emit events (scheduler, store,
/// plugin manager) depend on [`EventSink`] instead of this crate
/// directly, avoiding a dependency cycle through the composition root.
impl EventSink for Broadcaster {
    fn emit(&self, event: Event) {
        self.publish(event);
    }
}

/// A single-threaded cooperative consumer handle (`Subscribe`).
pub struct Subscription {
    id: SubscriberId,
    state: Arc<SubscriberState>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event in publish order ("within a subscriber, strict publish-order
    /// delivery"). Returns `None` once the broadcaster has closed this subscriber and drained
    /// its queue.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.state.queue.lock().pop_front() {
                return Some(event);
            }
            if self.state.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.state.notify.notified().await;
        }
    }

    /// Number of events dropped for this subscriber due to a full buffer
    /// ("increment a dropped counter").
    pub fn dropped_count(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
