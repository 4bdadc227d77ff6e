//! # Events emitted by the bulkhead.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Work events**: one item's path through the bulkhead (queued, starting, completed, failed, canceled)
//! - **Overflow events**: threshold breaches and fallback handler outcomes
//! - **Drain events**: a drain loop winning or giving back its permit
//! - **Lifecycle / subscriber events**: disposal, subscriber overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the item id,
//! batch size, queue depth and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use fallback_bulkhead::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BatchDiverted)
//!     .with_batch(100)
//!     .with_depth(3);
//!
//! assert_eq!(ev.kind, EventKind::BatchDiverted);
//! assert_eq!(ev.batch, Some(100));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of bulkhead events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Work events ===
    /// Item appended to the queue.
    ///
    /// Sets:
    /// - `item`: work item id
    /// - `depth`: queue depth right after the append
    WorkQueued,

    /// A drain loop dequeued the item and is about to run it.
    ///
    /// Sets:
    /// - `item`: work item id
    /// - `waited_ms`: time spent queued
    WorkStarting,

    /// Computation finished with a value.
    ///
    /// Sets:
    /// - `item`: work item id
    WorkCompleted,

    /// Computation finished with an error (or panicked).
    ///
    /// Sets:
    /// - `item`: work item id
    /// - `reason`: error message
    WorkFailed,

    /// Item dequeued with an already-cancelled token; it was not run.
    ///
    /// Sets:
    /// - `item`: work item id
    WorkCanceled,

    /// Items resolved as disposed because no permit could be won after disposal.
    ///
    /// Sets:
    /// - `batch`: number of items resolved
    WorkDisposed,

    // === Overflow events ===
    /// A queue limit was breached and a batch was removed for the fallback handler.
    ///
    /// Sets:
    /// - `batch`: batch size
    /// - `depth`: queue depth left behind
    BatchDiverted,

    /// Fallback handler returned successfully.
    ///
    /// Sets:
    /// - `batch`: batch size
    /// - `unresolved`: items the handler left unresolved (resolved as `Unresolved`)
    FallbackCompleted,

    /// Fallback handler failed or panicked.
    ///
    /// Sets:
    /// - `batch`: batch size
    /// - `unresolved`: items resolved with the handler failure
    /// - `reason`: handler error
    FallbackFailed,

    // === Drain events ===
    /// A caller won a permit and started draining.
    DrainStarted,

    /// A drain loop released its permit for good.
    ///
    /// Sets:
    /// - `processed`: items run by this loop
    DrainStopped,

    // === Lifecycle ===
    /// The bulkhead was disposed.
    Disposed,
}

/// Bulkhead event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Work item id, if applicable.
    pub item: Option<u64>,
    /// Batch size for overflow events.
    pub batch: Option<usize>,
    /// Queue depth observed when the event was built.
    pub depth: Option<usize>,
    /// Items left unresolved by a fallback handler.
    pub unresolved: Option<usize>,
    /// Items processed by a drain loop.
    pub processed: Option<u64>,
    /// Queue wait in milliseconds (compact).
    pub waited_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Subscriber name for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            item: None,
            batch: None,
            depth: None,
            unresolved: None,
            processed: None,
            waited_ms: None,
            reason: None,
            subscriber: None,
        }
    }

    #[inline]
    pub fn with_item(mut self, id: u64) -> Self {
        self.item = Some(id);
        self
    }

    #[inline]
    pub fn with_batch(mut self, size: usize) -> Self {
        self.batch = Some(size);
        self
    }

    #[inline]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    #[inline]
    pub fn with_unresolved(mut self, n: usize) -> Self {
        self.unresolved = Some(n);
        self
    }

    #[inline]
    pub fn with_processed(mut self, n: u64) -> Self {
        self.processed = Some(n);
        self
    }

    /// Attaches a queue wait (stored as milliseconds).
    #[inline]
    pub fn with_waited(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.waited_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::WorkQueued);
        let b = Event::new(EventKind::WorkQueued);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn waited_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::WorkStarting).with_waited(Duration::from_secs(u64::MAX));
        assert_eq!(ev.waited_ms, Some(u32::MAX));
    }

    #[test]
    fn subscriber_events_are_internal() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_internal());
        assert_eq!(ev.subscriber, Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
        assert!(!Event::new(EventKind::Disposed).is_internal());
    }
}
