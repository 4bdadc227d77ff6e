//! # FallbackBulkhead: the public façade.
//!
//! Caps how many computations run at once and diverts queue overflow to a
//! [`FallbackHandler`] in batches.
//!
//! ## Submission flow
//! ```text
//! submit(work, ctx, token)
//!   ├─► disposed? ──► Err(SubmitError::Disposed)
//!   ├─► PendingWork::new() ──► (item, handle)
//!   ├─► queue.append(item)  ──► limit breached? ──► spawn_fallback(batch)
//!   ├─► publish WorkQueued
//!   ├─► try_start()         ──► maybe spawn a drain loop
//!   └─► Ok(handle)                 (never blocks, never fails for capacity)
//! ```
//!
//! ## Rules
//! - Every handle returned by [`submit`](FallbackBulkhead::submit) resolves:
//!   by a drain loop, by the fallback handler (or its failure), by cancellation
//!   at dequeue, or by disposal.
//! - [`dispose`](FallbackBulkhead::dispose) is idempotent. Work already running
//!   finishes; work still queued is resolved with [`WorkError::Disposed`].
//! - `submit` spawns tasks and must be called from within a tokio runtime.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{
    config::BulkheadConfig,
    error::{ConfigError, SubmitError, WorkError},
    events::{Bus, Event, EventKind},
    policy::ExecutionPolicy,
    work::{CallContext, PendingWork, WorkFn, WorkHandle, WorkRef},
};

use super::{
    builder::BulkheadBuilder,
    dispatch::{reject_stranded, spawn_fallback, try_start},
    fallback::{FallbackHandler, FallbackRef, RejectAll},
    gate::AdmissionGate,
    queue::OverflowQueue,
    stats::{BulkheadStats, StatsCounters},
};

/// State shared by the façade, its clones and every drain loop.
pub(crate) struct Shared<T> {
    pub(crate) queue: OverflowQueue<T>,
    pub(crate) gate: AdmissionGate,
    pub(crate) fallback: FallbackRef<T>,
    pub(crate) bus: Bus,
    pub(crate) stats: StatsCounters,
    pub(crate) evaluate_on_submit: bool,
    /// Cancelled when the last owner goes away; stops the subscriber listener.
    pub(crate) lifecycle: CancellationToken,
}

impl<T> Shared<T> {
    /// Publishes an event, skipping its construction when nobody listens.
    #[inline]
    pub(crate) fn publish(&self, build: impl FnOnce() -> Event) {
        if !self.bus.is_idle() {
            self.bus.publish(build());
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}

/// Concurrency-limiting executor with batched overflow diversion.
///
/// Cheap to clone; clones share the same permits, queue and handler.
///
/// # Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use fallback_bulkhead::{CallContext, FallbackBatch, FallbackBulkhead, WorkError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> anyhow::Result<()> {
///     let bulkhead = FallbackBulkhead::new(
///         2,
///         |batch: FallbackBatch<u32>| async move {
///             for item in batch.iter() {
///                 item.complete(0);
///             }
///             Ok(())
///         },
///         vec![100],
///     )?;
///
///     let handle = bulkhead.submit_fn(
///         |_ctx: CallContext, _token: CancellationToken| async { Ok::<_, WorkError>(7) },
///         CallContext::new(),
///         CancellationToken::new(),
///     )?;
///     assert_eq!(handle.await, Ok(7));
///     Ok(())
/// }
/// ```
pub struct FallbackBulkhead<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for FallbackBulkhead<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> FallbackBulkhead<T> {
    /// Starts building a bulkhead from `cfg`.
    pub fn builder(cfg: BulkheadConfig) -> BulkheadBuilder<T> {
        BulkheadBuilder::new(cfg)
    }

    /// Builds a bulkhead with default settings besides the given ones.
    ///
    /// Fails if `max_parallelization == 0` or any limit is `0`.
    pub fn new<H>(
        max_parallelization: usize,
        handler: H,
        queue_limits: Vec<usize>,
    ) -> Result<Self, ConfigError>
    where
        H: FallbackHandler<T>,
    {
        Self::builder(BulkheadConfig::new(max_parallelization, queue_limits))
            .with_fallback(handler)
            .build()
    }

    /// Builds a bulkhead with an unbounded queue; nothing is ever diverted.
    pub fn unbounded(max_parallelization: usize) -> Result<Self, ConfigError> {
        Self::builder(BulkheadConfig::new(max_parallelization, Vec::new()))
            .with_fallback(RejectAll)
            .build()
    }

    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// Enqueues `work` and returns a handle resolving to its outcome.
    ///
    /// Never waits and never fails for capacity reasons; the only refusal is
    /// [`SubmitError::Disposed`].
    pub fn submit(
        &self,
        work: WorkRef<T>,
        ctx: CallContext,
        token: CancellationToken,
    ) -> Result<WorkHandle<T>, SubmitError> {
        let shared = &self.shared;
        if shared.gate.is_closed() {
            return Err(SubmitError::Disposed);
        }

        let (item, handle) = PendingWork::new(work, ctx, token);
        let id = item.id();
        shared.stats.record_queued();

        let appended = shared.queue.append(item, shared.evaluate_on_submit);
        shared.publish(|| {
            Event::new(EventKind::WorkQueued)
                .with_item(id)
                .with_depth(appended.depth)
        });
        if let Some(batch) = appended.diverted {
            let remaining = appended.depth - batch.len();
            spawn_fallback(shared, batch, remaining);
        }

        try_start(shared);
        Ok(handle)
    }

    /// [`submit`](Self::submit) for a closure.
    pub fn submit_fn<F, Fut>(
        &self,
        f: F,
        ctx: CallContext,
        token: CancellationToken,
    ) -> Result<WorkHandle<T>, SubmitError>
    where
        F: Fn(CallContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        self.submit(WorkFn::arc(f), ctx, token)
    }

    /// Closes the bulkhead. Returns `true` for the call that actually closed it.
    ///
    /// Later submissions fail with [`SubmitError::Disposed`]; queued items resolve
    /// with [`WorkError::Disposed`]; running computations and in-flight fallback
    /// batches finish normally.
    pub fn dispose(&self) -> bool {
        let shared = &self.shared;
        if !shared.gate.close() {
            return false;
        }
        shared.publish(|| Event::new(EventKind::Disposed).with_depth(shared.queue.len()));
        reject_stranded(shared);
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.gate.is_closed()
    }

    /// Permits not currently held (`0` once disposed).
    pub fn available_execution_slots(&self) -> usize {
        self.shared.gate.available()
    }

    /// Room left below the smallest queue limit, floored at `0`; `None` if unbounded.
    pub fn available_queue_slots(&self) -> Option<usize> {
        self.shared.queue.available_slots()
    }

    pub fn max_parallelization(&self) -> usize {
        self.shared.gate.capacity()
    }

    /// Items currently waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn stats(&self) -> BulkheadStats {
        self.shared.stats.snapshot()
    }

    /// Receives events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }
}

#[async_trait]
impl<T: Send + 'static> ExecutionPolicy<T> for FallbackBulkhead<T> {
    async fn execute(
        &self,
        work: WorkRef<T>,
        ctx: CallContext,
        token: CancellationToken,
    ) -> Result<T, WorkError> {
        self.submit(work, ctx, token)?.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::Notify;

    use crate::core::fallback::FallbackBatch;

    fn value(v: u32) -> WorkRef<u32> {
        WorkFn::arc(move |_ctx: CallContext, _t: CancellationToken| async move {
            Ok::<_, WorkError>(v)
        })
    }

    fn slow(v: u32, ms: u64) -> WorkRef<u32> {
        WorkFn::arc(move |_ctx: CallContext, _t: CancellationToken| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, WorkError>(v)
        })
    }

    fn run_everything() -> impl FallbackHandler<u32> {
        |batch: FallbackBatch<u32>| async move {
            for item in batch.iter() {
                item.execute().await;
            }
            Ok(())
        }
    }

    #[test]
    fn construction_is_validated() {
        assert_eq!(
            FallbackBulkhead::<u32>::new(0, run_everything(), Vec::new()).err(),
            Some(ConfigError::ZeroParallelization)
        );
        assert_eq!(
            FallbackBulkhead::<u32>::new(1, run_everything(), vec![5, 0]).err(),
            Some(ConfigError::ZeroQueueLimit { index: 1 })
        );
        assert_eq!(
            FallbackBulkhead::<u32>::builder(BulkheadConfig::new(1, Vec::new()))
                .build()
                .err(),
            Some(ConfigError::MissingFallback)
        );
    }

    #[tokio::test]
    async fn introspection_reflects_configuration() {
        let bh = FallbackBulkhead::<u32>::new(3, run_everything(), vec![50, 20]).expect("build");
        assert_eq!(bh.max_parallelization(), 3);
        assert_eq!(bh.available_execution_slots(), 3);
        assert_eq!(bh.available_queue_slots(), Some(20));

        let unbounded = FallbackBulkhead::<u32>::unbounded(2).expect("build");
        assert_eq!(unbounded.available_queue_slots(), None);
    }

    #[tokio::test]
    async fn submitted_work_resolves_with_its_value() {
        let bh = FallbackBulkhead::unbounded(2).expect("build");
        let handle = bh
            .submit(value(41), CallContext::new(), CancellationToken::new())
            .expect("submit");
        assert_eq!(handle.await, Ok(41));

        let stats = bh.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.diverted_batches, 0);
    }

    #[tokio::test]
    async fn computation_error_is_isolated_to_its_item() {
        let bh = FallbackBulkhead::unbounded(1).expect("build");
        let bad = bh
            .submit_fn(
                |_ctx: CallContext, _t: CancellationToken| async {
                    Err::<u32, _>(WorkError::fail("upstream 503"))
                },
                CallContext::new(),
                CancellationToken::new(),
            )
            .expect("submit");
        let good = bh
            .submit(value(1), CallContext::new(), CancellationToken::new())
            .expect("submit");

        assert_eq!(bad.await, Err(WorkError::fail("upstream 503")));
        assert_eq!(good.await, Ok(1));
        assert_eq!(bh.stats().failed, 1);
    }

    #[tokio::test]
    async fn cancelled_token_is_honored_at_dequeue() {
        let bh = FallbackBulkhead::unbounded(1).expect("build");
        let ran = Arc::new(AtomicUsize::new(0));

        // Holds the only permit so the next item stays queued.
        let blocker = bh
            .submit(slow(0, 50), CallContext::new(), CancellationToken::new())
            .expect("submit");

        let token = CancellationToken::new();
        let counter = Arc::clone(&ran);
        let cancelled = bh
            .submit_fn(
                move |_ctx: CallContext, _t: CancellationToken| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, WorkError>(1)
                    }
                },
                CallContext::new(),
                token.clone(),
            )
            .expect("submit");
        token.cancel();

        assert_eq!(blocker.await, Ok(0));
        assert_eq!(cancelled.await, Err(WorkError::Canceled));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(bh.stats().canceled, 1);
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_refuses_new_work() {
        let bh = FallbackBulkhead::<u32>::unbounded(1).expect("build");
        assert!(bh.dispose());
        assert!(!bh.dispose());
        assert!(bh.is_disposed());
        assert_eq!(bh.available_execution_slots(), 0);

        let refused = bh.submit(value(1), CallContext::new(), CancellationToken::new());
        assert_eq!(refused.err(), Some(SubmitError::Disposed));
    }

    #[tokio::test]
    async fn dispose_resolves_queued_work() {
        let bh = FallbackBulkhead::unbounded(1).expect("build");
        let started = Arc::new(Notify::new());
        let signal = Arc::clone(&started);
        let running = bh
            .submit_fn(
                move |_ctx: CallContext, _t: CancellationToken| {
                    let signal = Arc::clone(&signal);
                    async move {
                        signal.notify_one();
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, WorkError>(5)
                    }
                },
                CallContext::new(),
                CancellationToken::new(),
            )
            .expect("submit");
        started.notified().await;

        let queued = bh
            .submit(value(6), CallContext::new(), CancellationToken::new())
            .expect("submit");

        bh.dispose();

        assert_eq!(running.await, Ok(5));
        assert_eq!(queued.await, Err(WorkError::Disposed));
        assert_eq!(bh.queue_len(), 0);
    }

    #[tokio::test]
    async fn execution_policy_maps_disposal_to_work_error() {
        let bh = FallbackBulkhead::<u32>::unbounded(1).expect("build");
        assert_eq!(
            bh.execute(value(3), CallContext::new(), CancellationToken::new())
                .await,
            Ok(3)
        );
        bh.dispose();
        assert_eq!(
            bh.execute(value(3), CallContext::new(), CancellationToken::new())
                .await,
            Err(WorkError::Disposed)
        );
    }

    #[tokio::test]
    async fn events_trace_a_diverted_batch() {
        let bh = FallbackBulkhead::new(1, run_everything(), vec![2]).expect("build");
        let mut rx = bh.subscribe();

        let blocker = bh
            .submit(slow(0, 50), CallContext::new(), CancellationToken::new())
            .expect("submit");
        let a = bh
            .submit(value(1), CallContext::new(), CancellationToken::new())
            .expect("submit");
        let b = bh
            .submit(value(2), CallContext::new(), CancellationToken::new())
            .expect("submit");

        assert_eq!(a.await, Ok(1));
        assert_eq!(b.await, Ok(2));
        assert_eq!(blocker.await, Ok(0));

        let mut diverted = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::BatchDiverted {
                diverted = ev.batch;
            }
        }
        assert_eq!(diverted, Some(2));
        assert_eq!(bh.stats().diverted_items, 2);
    }
}
