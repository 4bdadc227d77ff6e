//! # Drain loops.
//!
//! Whoever wins a permit from the [`AdmissionGate`](super::gate::AdmissionGate)
//! owns one drain loop until it gives the permit back. A drain loop is a
//! spawned task that runs queued items one at a time.
//!
//! ## Loop
//! ```text
//! try_start(): queue non-empty? ──► gate.try_acquire()
//!                                      ├─ Granted ─► spawn drain(permit)
//!                                      ├─ Busy    ─► (a running loop will pick it up)
//!                                      └─ Closed  ─► reject_stranded()
//!
//! drain(permit):
//!   loop {
//!     ├─► queue.next()
//!     │     ├─ Divert{batch} ─► spawn_fallback(batch)     (no permit used)
//!     │     ├─ Run(item)     ─► run_item(item).await       (sequential, FIFO)
//!     │     └─ Empty         ─► fall through
//!     ├─► drop(permit)
//!     └─► queue empty? ─► stop
//!         else gate.try_acquire()
//!               ├─ Granted ─► continue with the new permit
//!               ├─ Busy    ─► stop (another loop owns the rest)
//!               └─ Closed  ─► reject_stranded(), stop
//!   }
//! ```
//!
//! ## Rules
//! - At most `max_parallelization` loops exist (one per permit).
//! - Items taken by one loop run strictly one after another.
//! - The re-check after releasing closes the race with a submitter that
//!   appended while every permit was held and lost its own acquisition.
//! - An item whose token is already cancelled at dequeue is resolved as
//!   [`WorkError::Canceled`] without running.

use std::sync::Arc;

use tracing::debug;

use crate::{
    error::WorkError,
    events::{Event, EventKind},
    work::PendingWork,
};

use super::{
    bulkhead::Shared,
    fallback::{FallbackBatch, dispatch_batch},
    gate::{Admission, Permit},
    queue::Next,
};

/// Starts a drain loop if there is queued work and a free permit.
pub(crate) fn try_start<T: Send + 'static>(shared: &Arc<Shared<T>>) {
    if shared.queue.is_empty() {
        return;
    }
    match shared.gate.try_acquire() {
        Admission::Granted(permit) => {
            tokio::spawn(drain(Arc::clone(shared), permit));
        }
        Admission::Busy => {}
        Admission::Closed => reject_stranded(shared),
    }
}

/// Hands a diverted batch to the fallback handler on its own task.
pub(crate) fn spawn_fallback<T: Send + 'static>(
    shared: &Shared<T>,
    batch: Vec<PendingWork<T>>,
    remaining: usize,
) {
    let size = batch.len();
    shared.stats.record_diverted(size);
    debug!(size, remaining, "queue limit breached, diverting batch");
    shared.publish(|| {
        Event::new(EventKind::BatchDiverted)
            .with_batch(size)
            .with_depth(remaining)
    });

    let handler = Arc::clone(&shared.fallback);
    let bus = shared.bus.clone();
    tokio::spawn(async move {
        dispatch_batch(&handler, FallbackBatch::from(batch), &bus).await;
    });
}

/// Resolves everything left in the queue as [`WorkError::Disposed`].
pub(crate) fn reject_stranded<T: Send + 'static>(shared: &Shared<T>) {
    let stranded = shared.queue.drain_all();
    if stranded.is_empty() {
        return;
    }
    let count = stranded
        .iter()
        .filter(|item| item.reject(WorkError::Disposed))
        .count();
    debug!(count, "resolved queued work after disposal");
    shared.publish(|| Event::new(EventKind::WorkDisposed).with_batch(count));
}

/// Body of one drain loop; `permit` is released when the loop stops.
pub(crate) async fn drain<T: Send + 'static>(shared: Arc<Shared<T>>, mut permit: Permit) {
    shared.publish(|| Event::new(EventKind::DrainStarted));
    let mut processed: u64 = 0;

    loop {
        loop {
            match shared.queue.next() {
                Next::Divert { batch, remaining } => spawn_fallback(&shared, batch, remaining),
                Next::Run(item) => {
                    if run_item(&shared, item).await {
                        processed += 1;
                    }
                }
                Next::Empty => break,
            }
        }

        drop(permit);
        if shared.queue.is_empty() {
            break;
        }
        match shared.gate.try_acquire() {
            Admission::Granted(next) => permit = next,
            Admission::Busy => break,
            Admission::Closed => {
                reject_stranded(&shared);
                break;
            }
        }
    }

    shared.publish(|| Event::new(EventKind::DrainStopped).with_processed(processed));
}

/// Runs one dequeued item and resolves it. Returns `false` if it was cancelled instead.
async fn run_item<T: Send + 'static>(shared: &Shared<T>, item: PendingWork<T>) -> bool {
    let id = item.id();
    if item.token().is_cancelled() {
        shared.stats.record_canceled();
        shared.publish(|| Event::new(EventKind::WorkCanceled).with_item(id));
        item.reject(WorkError::Canceled);
        return false;
    }

    shared.publish(|| {
        Event::new(EventKind::WorkStarting)
            .with_item(id)
            .with_waited(item.waited())
    });
    let outcome = item.run().await;

    shared.stats.record_executed(outcome.is_ok());
    match &outcome {
        Ok(_) => shared.publish(|| Event::new(EventKind::WorkCompleted).with_item(id)),
        Err(err) => shared.publish(|| {
            Event::new(EventKind::WorkFailed)
                .with_item(id)
                .with_reason(err.to_string())
        }),
    }
    item.resolve(outcome);
    true
}
