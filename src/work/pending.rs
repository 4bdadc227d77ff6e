//! # Pending work item and its single-assignment result.
//!
//! A [`PendingWork`] is created at submission and owns the computation, its
//! [`CallContext`], its cancellation token and the write side of a one-shot
//! result slot. The caller keeps the read side as a [`WorkHandle`].
//!
//! ## Rules
//! - The slot is written **exactly once**. Later writes are no-ops that return `false`;
//!   they never overwrite and never fail.
//! - Dropping an item whose slot was never written resolves its handle with
//!   [`WorkError::Unresolved`], so a handle never waits forever.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WorkError,
    work::{CallContext, WorkRef},
};

/// Global id counter for work items.
static WORK_SEQ: AtomicU64 = AtomicU64::new(1);

type Outcome<T> = Result<T, WorkError>;

/// Write side of the one-shot result.
struct ResultSlot<T> {
    tx: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
}

impl<T> ResultSlot<T> {
    fn new() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Writes `outcome` if the slot is still empty.
    fn set(&self, outcome: Outcome<T>) -> bool {
        match self.tx.lock().take() {
            Some(tx) => {
                // The caller may have dropped its handle; the item still counts as resolved.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    fn is_set(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl<T> Drop for ResultSlot<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.get_mut().take() {
            let _ = tx.send(Err(WorkError::Unresolved));
        }
    }
}

/// One submitted computation waiting for a drain loop or a fallback handler.
///
/// Fallback handlers receive items by reference inside a
/// [`FallbackBatch`](crate::FallbackBatch) and decide each item's outcome with
/// [`complete`](PendingWork::complete), [`reject`](PendingWork::reject) or
/// [`execute`](PendingWork::execute).
pub struct PendingWork<T> {
    id: u64,
    work: WorkRef<T>,
    ctx: CallContext,
    token: CancellationToken,
    slot: ResultSlot<T>,
    enqueued_at: Instant,
}

impl<T: Send + 'static> PendingWork<T> {
    /// Creates an item and the handle its submitter awaits.
    pub(crate) fn new(
        work: WorkRef<T>,
        ctx: CallContext,
        token: CancellationToken,
    ) -> (Self, WorkHandle<T>) {
        let id = WORK_SEQ.fetch_add(1, Ordering::Relaxed);
        let (slot, rx) = ResultSlot::new();
        let item = Self {
            id,
            work,
            ctx,
            token,
            slot,
            enqueued_at: Instant::now(),
        };
        (item, WorkHandle { id, rx })
    }

    /// Process-wide unique id of this item.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Context supplied at submission.
    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Cancellation token supplied at submission.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Time spent since submission.
    pub fn waited(&self) -> Duration {
        self.enqueued_at.elapsed()
    }

    /// True once an outcome was written.
    pub fn is_resolved(&self) -> bool {
        self.slot.is_set()
    }

    /// Writes `outcome` if none was written yet; returns whether this call wrote it.
    pub fn resolve(&self, outcome: Result<T, WorkError>) -> bool {
        self.slot.set(outcome)
    }

    /// Resolves with a value.
    pub fn complete(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// Resolves with an error.
    pub fn reject(&self, err: WorkError) -> bool {
        self.resolve(Err(err))
    }

    /// Runs the computation here and resolves the item with its outcome.
    ///
    /// Returns `false` without running anything if the item is already resolved.
    pub async fn execute(&self) -> bool {
        if self.is_resolved() {
            return false;
        }
        let outcome = self.run().await;
        self.resolve(outcome)
    }

    /// Runs the computation, converting a panic into [`WorkError::Panicked`].
    pub(crate) async fn run(&self) -> Result<T, WorkError> {
        let call = async { self.work.call(self.ctx.clone(), self.token.clone()).await };
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(WorkError::from_panic(panic.as_ref())),
        }
    }
}

impl<T> fmt::Debug for PendingWork<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWork")
            .field("id", &self.id)
            .field("ctx", &self.ctx)
            .field("cancelled", &self.token.is_cancelled())
            .field("resolved", &self.slot.is_set())
            .finish()
    }
}

/// Caller side of a submission: resolves to the item's outcome.
#[must_use = "dropping the handle discards the outcome"]
pub struct WorkHandle<T> {
    id: u64,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> WorkHandle<T> {
    /// Id of the underlying [`PendingWork`].
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Future for WorkHandle<T> {
    type Output = Result<T, WorkError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(WorkError::Unresolved)))
    }
}

impl<T> fmt::Debug for WorkHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkHandle").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkFn;

    fn item(value: u32) -> (PendingWork<u32>, WorkHandle<u32>) {
        let work: WorkRef<u32> =
            WorkFn::arc(move |_ctx: CallContext, _t: CancellationToken| async move {
                Ok::<_, WorkError>(value)
            });
        PendingWork::new(work, CallContext::new(), CancellationToken::new())
    }

    #[tokio::test]
    async fn second_resolution_is_a_noop() {
        let (pending, handle) = item(1);

        assert!(pending.complete(10));
        assert!(!pending.reject(WorkError::fail("late")));
        assert!(!pending.complete(20));
        assert!(pending.is_resolved());

        assert_eq!(handle.await, Ok(10));
    }

    #[tokio::test]
    async fn execute_runs_computation_once() {
        let (pending, handle) = item(7);

        assert!(pending.execute().await);
        assert!(!pending.execute().await);
        assert_eq!(handle.await, Ok(7));
    }

    #[tokio::test]
    async fn dropped_item_resolves_unresolved() {
        let (pending, handle) = item(3);
        drop(pending);
        assert_eq!(handle.await, Err(WorkError::Unresolved));
    }

    #[tokio::test]
    async fn panicking_computation_becomes_error() {
        fn explode() -> Result<u32, WorkError> {
            panic!("kaboom")
        }
        let work: WorkRef<u32> =
            WorkFn::arc(|_ctx: CallContext, _t: CancellationToken| async { explode() });
        let (pending, handle) =
            PendingWork::new(work, CallContext::new(), CancellationToken::new());

        assert!(pending.execute().await);
        assert_eq!(
            handle.await,
            Err(WorkError::Panicked {
                info: "kaboom".into()
            })
        );
    }

    #[test]
    fn ids_are_unique() {
        let (a, ha) = item(0);
        let (b, hb) = item(0);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), ha.id());
        assert_eq!(b.id(), hb.id());
    }
}
