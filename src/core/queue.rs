//! # Overflow queue and threshold evaluation.
//!
//! The queue is the only cross-caller state besides the permit count. Every
//! mutation happens inside one short `parking_lot::Mutex` critical section, so:
//!
//! - an append and the threshold decision that follows it are one step;
//! - a batch removal takes the `n` oldest items at once, and a concurrent append
//!   lands after the batch boundary;
//! - an item shows up in at most one removal result.
//!
//! ## Threshold rule
//! Limits are kept sorted in descending order. On evaluation the **largest**
//! limit the current depth meets is the breached one; in
//! [`OverflowMode::Chunk`] exactly that many oldest items are removed, in
//! [`OverflowMode::Swap`] the whole backing store is. At most one batch is
//! produced per evaluation.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{config::OverflowMode, work::PendingWork};

/// Result of an append.
pub(crate) struct Appended<T> {
    /// Depth right after the append (before any diversion).
    pub depth: usize,
    /// Batch removed because the append breached a limit.
    pub diverted: Option<Vec<PendingWork<T>>>,
}

/// What a drain loop should do next.
pub(crate) enum Next<T> {
    /// Hand this batch to the fallback dispatcher.
    Divert {
        batch: Vec<PendingWork<T>>,
        remaining: usize,
    },
    /// Execute this item.
    Run(PendingWork<T>),
    /// Nothing queued.
    Empty,
}

pub(crate) struct OverflowQueue<T> {
    items: Mutex<VecDeque<PendingWork<T>>>,
    /// Descending, deduplicated, all `> 0`.
    limits: Vec<usize>,
    mode: OverflowMode,
}

impl<T> OverflowQueue<T> {
    pub(crate) fn new(limits: Vec<usize>, mode: OverflowMode) -> Self {
        debug_assert!(limits.windows(2).all(|w| w[0] > w[1]));
        Self {
            items: Mutex::new(VecDeque::new()),
            limits,
            mode,
        }
    }

    /// Appends at the tail and, if `evaluate`, applies the threshold rule in the same critical section.
    pub(crate) fn append(&self, item: PendingWork<T>, evaluate: bool) -> Appended<T> {
        let mut items = self.items.lock();
        items.push_back(item);
        let depth = items.len();
        let diverted = if evaluate {
            self.take_overflow(&mut items)
        } else {
            None
        };
        Appended { depth, diverted }
    }

    /// One drain-loop decision: divert a breached batch, else pop the oldest item.
    pub(crate) fn next(&self) -> Next<T> {
        let mut items = self.items.lock();
        if let Some(batch) = self.take_overflow(&mut items) {
            return Next::Divert {
                batch,
                remaining: items.len(),
            };
        }
        match items.pop_front() {
            Some(item) => Next::Run(item),
            None => Next::Empty,
        }
    }

    /// Removes everything (used when the gate is closed).
    pub(crate) fn drain_all(&self) -> Vec<PendingWork<T>> {
        Vec::from(std::mem::take(&mut *self.items.lock()))
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Largest configured limit that `depth` meets.
    pub(crate) fn breached(&self, depth: usize) -> Option<usize> {
        self.limits.iter().copied().find(|&limit| depth >= limit)
    }

    /// Room left below the smallest limit; `None` when unbounded.
    pub(crate) fn available_slots(&self) -> Option<usize> {
        let smallest = *self.limits.last()?;
        Some(smallest.saturating_sub(self.len()))
    }

    fn take_overflow(&self, items: &mut VecDeque<PendingWork<T>>) -> Option<Vec<PendingWork<T>>> {
        let limit = self.breached(items.len())?;
        let batch = match self.mode {
            // `breached` guarantees `limit <= items.len()`.
            OverflowMode::Chunk => items.drain(..limit).collect(),
            OverflowMode::Swap => Vec::from(std::mem::take(items)),
        };
        Some(batch)
    }
}
