//! # Event bus for broadcasting bulkhead events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (submitters, drain loops,
//! fallback dispatches).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Subscribers:
//!   submit()        ──┐
//!   drain loop 1..N ──┼──────► Bus ───────► subscriber listener ────► SubscriberSet
//!   fallback batch  ──┤  (broadcast chan)
//!   dispose()       ──┘                 └──► FallbackBulkhead::subscribe() receivers
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for bulkhead events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// True when nobody listens; lets hot paths skip building events.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.tx.receiver_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_observe_events_sent_after_subscribe() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::DrainStarted));
        assert!(bus.is_idle());

        let mut rx = bus.subscribe();
        assert!(!bus.is_idle());
        bus.publish(Event::new(EventKind::BatchDiverted).with_batch(5));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::BatchDiverted);
        assert_eq!(ev.batch, Some(5));
    }
}
