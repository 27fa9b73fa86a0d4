//! Explicit "resource destroyed" events.
//!
//! Destroying a device object publishes its handle here. Interested parties
//! (the geometry cache) subscribe once, poll for handles destroyed since their
//! last poll, and unsubscribe when they go away. Events every live subscriber
//! has seen are trimmed.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct LogInner {
    /// Events not yet seen by every subscriber.
    events: Vec<Handle>,
    /// Sequence number of `events[0]`.
    base: u64,
    /// Subscriber -> sequence number of the next unseen event.
    cursors: HashMap<u64, u64>,
    next_subscriber: u64,
}

impl LogInner {
    fn end(&self) -> u64 {
        self.base + self.events.len() as u64
    }

    fn trim(&mut self) {
        let oldest = self.cursors.values().copied().min().unwrap_or(self.end());
        let seen = (oldest - self.base) as usize;
        if seen > 0 {
            self.events.drain(..seen);
            self.base = oldest;
        }
    }
}

#[derive(Default)]
pub struct DestructionLog {
    inner: RwLock<LogInner>,
}

impl DestructionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `handle` was destroyed. Dropped immediately when nobody listens.
    pub fn publish(&self, handle: Handle) {
        let mut inner = self.inner.write();
        if inner.cursors.is_empty() {
            return;
        }
        inner.events.push(handle);
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> SubscriberId {
        let mut inner = self.inner.write();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        let end = inner.end();
        inner.cursors.insert(id, end);
        SubscriberId(id)
    }

    /// Handles destroyed since the subscriber's previous poll, in publish order.
    pub fn poll(&self, subscriber: SubscriberId) -> Vec<Handle> {
        if self.pending(subscriber) == 0 {
            return Vec::new();
        }

        let mut inner = self.inner.write();
        let end = inner.end();
        let Some(cursor) = inner.cursors.get_mut(&subscriber.0) else {
            return Vec::new();
        };
        let start = *cursor;
        *cursor = end;
        let from = (start - inner.base) as usize;
        let out = inner.events[from..].to_vec();
        inner.trim();
        out
    }

    /// Number of events the subscriber has not polled yet.
    pub fn pending(&self, subscriber: SubscriberId) -> usize {
        let inner = self.inner.read();
        inner
            .cursors
            .get(&subscriber.0)
            .map(|cursor| (inner.end() - cursor) as usize)
            .unwrap_or(0)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberId) {
        let mut inner = self.inner.write();
        inner.cursors.remove(&subscriber.0);
        inner.trim();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.read().cursors.len()
    }

    /// Events retained for subscribers that have not polled them yet.
    pub fn retained(&self) -> usize {
        self.inner.read().events.len()
    }
}
