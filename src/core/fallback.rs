//! # Fallback dispatch for diverted batches.
//!
//! When a queue limit is breached, the removed items travel together as one
//! [`FallbackBatch`] to the caller-supplied [`FallbackHandler`]. The handler
//! decides every item's outcome: it may complete it with a substitute value,
//! reject it, or run its computation elsewhere via [`PendingWork::execute`].
//!
//! ## Rules
//! - The handler is invoked **exactly once** per batch, outside the admission gate.
//! - The batch is ordered oldest-first and read-only (items are shared, not owned).
//! - If the handler fails (error or panic), every item it left unresolved is
//!   resolved with [`WorkError::FallbackFailed`]; items it already resolved keep
//!   their outcome.
//! - If the handler returns `Ok(())` but leaves items unresolved, those resolve
//!   with [`WorkError::Unresolved`]. Resolve items before returning.

use std::future::Future;
use std::ops::Deref;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::error::{WorkError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::work::PendingWork;

/// Boxed future returned by [`FallbackHandler::handle`].
pub type FallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Shared handle to a fallback handler.
pub type FallbackRef<T> = Arc<dyn FallbackHandler<T>>;

/// Decides the outcome of diverted work.
///
/// Implemented for any `Fn(FallbackBatch<T>) -> impl Future<Output = anyhow::Result<()>>`.
///
/// # Example
/// ```
/// use fallback_bulkhead::{FallbackBatch, FallbackHandler, WorkError};
///
/// fn shed() -> impl FallbackHandler<u32> {
///     |batch: FallbackBatch<u32>| async move {
///         for item in batch.iter() {
///             item.reject(WorkError::rejected("shed under load"));
///         }
///         Ok(())
///     }
/// }
/// # let _ = shed();
/// ```
pub trait FallbackHandler<T>: Send + Sync + 'static {
    /// Handles one diverted batch.
    fn handle(&self, batch: FallbackBatch<T>) -> FallbackFuture;
}

impl<T, F, Fut> FallbackHandler<T> for F
where
    F: Fn(FallbackBatch<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn handle(&self, batch: FallbackBatch<T>) -> FallbackFuture {
        Box::pin(self(batch))
    }
}

/// Handler that rejects every diverted item.
///
/// Used by [`FallbackBulkhead::unbounded`](crate::FallbackBulkhead::unbounded),
/// where no limit exists and the handler is never reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl<T: Send + 'static> FallbackHandler<T> for RejectAll {
    fn handle(&self, batch: FallbackBatch<T>) -> FallbackFuture {
        Box::pin(async move {
            batch.resolve_remaining(WorkError::rejected("queue limit exceeded"));
            Ok(())
        })
    }
}

/// Ordered, read-only group of diverted items.
///
/// Cheap to clone. Dereferences to a slice of [`PendingWork`].
pub struct FallbackBatch<T> {
    items: Arc<[PendingWork<T>]>,
}

impl<T> Clone for FallbackBatch<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Deref for FallbackBatch<T> {
    type Target = [PendingWork<T>];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> From<Vec<PendingWork<T>>> for FallbackBatch<T> {
    fn from(items: Vec<PendingWork<T>>) -> Self {
        Self {
            items: items.into(),
        }
    }
}

impl<T: Send + 'static> FallbackBatch<T> {
    /// Number of items not resolved yet.
    pub fn unresolved(&self) -> usize {
        self.items.iter().filter(|it| !it.is_resolved()).count()
    }

    /// Resolves every still-unresolved item with `err`; returns how many were resolved here.
    pub fn resolve_remaining(&self, err: WorkError) -> usize {
        self.items
            .iter()
            .filter(|it| it.reject(err.clone()))
            .count()
    }
}

/// Runs `handler` over `batch` and makes sure every item ends up resolved.
pub(crate) async fn dispatch_batch<T: Send + 'static>(
    handler: &FallbackRef<T>,
    batch: FallbackBatch<T>,
    bus: &Bus,
) {
    let size = batch.len();
    let call = async { handler.handle(batch.clone()).await };

    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => {
            let unresolved = batch.resolve_remaining(WorkError::Unresolved);
            if unresolved > 0 {
                warn!(size, unresolved, "fallback handler returned with unresolved items");
            } else {
                debug!(size, "fallback batch handled");
            }
            bus.publish(
                Event::new(EventKind::FallbackCompleted)
                    .with_batch(size)
                    .with_unresolved(unresolved),
            );
        }
        Ok(Err(err)) => {
            let failure = WorkError::from_handler(&err);
            let unresolved = batch.resolve_remaining(failure);
            warn!(size, unresolved, error = %format!("{err:#}"), "fallback handler failed");
            bus.publish(
                Event::new(EventKind::FallbackFailed)
                    .with_batch(size)
                    .with_unresolved(unresolved)
                    .with_reason(format!("{err:#}")),
            );
        }
        Err(panic) => {
            let info = panic_message(panic.as_ref());
            let failure = WorkError::FallbackFailed {
                error: format!("handler panicked: {info}").into(),
            };
            let unresolved = batch.resolve_remaining(failure);
            warn!(size, unresolved, %info, "fallback handler panicked");
            bus.publish(
                Event::new(EventKind::FallbackFailed)
                    .with_batch(size)
                    .with_unresolved(unresolved)
                    .with_reason(info),
            );
        }
    }
}
