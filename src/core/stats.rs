//! # Bulkhead counters.
//!
//! Relaxed atomics bumped on the hot path; [`BulkheadStats`] is a point-in-time
//! copy. Counters are independent, so a snapshot taken while work is in flight
//! may be momentarily inconsistent across fields.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a bulkhead's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkheadStats {
    /// Computations run by drain loops (successful or not).
    pub executed: u64,
    /// Subset of `executed` that finished with an error or a panic.
    pub failed: u64,
    /// Items dequeued with a cancelled token and never run.
    pub canceled: u64,
    /// Batches handed to the fallback handler.
    pub diverted_batches: u64,
    /// Items inside those batches.
    pub diverted_items: u64,
    /// Items accepted by `submit`.
    pub queued: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    executed: AtomicU64,
    failed: AtomicU64,
    canceled: AtomicU64,
    diverted_batches: AtomicU64,
    diverted_items: AtomicU64,
    queued: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_executed(&self, ok: bool) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_canceled(&self) {
        self.canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_diverted(&self, items: usize) {
        self.diverted_batches.fetch_add(1, Ordering::Relaxed);
        self.diverted_items
            .fetch_add(items as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BulkheadStats {
        BulkheadStats {
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
            diverted_batches: self.diverted_batches.load(Ordering::Relaxed),
            diverted_items: self.diverted_items.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
        }
    }
}
