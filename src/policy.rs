//! # Execution policies.
//!
//! [`ExecutionPolicy`] is the seam a host resilience pipeline plugs into:
//! anything that can run a [`Work`](crate::Work) on the caller's behalf. The
//! bulkhead implements it, and so can retry, timeout or circuit-breaker layers
//! living outside this crate.
//!
//! [`PolicyWrap`] composes two policies: the inner one becomes the outer one's
//! computation, so the outer sees the inner's outcome as an ordinary result.
//!
//! ```text
//! PolicyWrap { outer: Retry, inner: FallbackBulkhead }
//!
//! execute(work) ──► Retry.execute(  ──► FallbackBulkhead.execute(work)  )
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WorkError,
    work::{CallContext, WorkFn, WorkRef},
};

/// Something that runs work and reports its outcome.
#[async_trait]
pub trait ExecutionPolicy<T: Send + 'static>: Send + Sync + 'static {
    /// Runs `work` under this policy.
    async fn execute(
        &self,
        work: WorkRef<T>,
        ctx: CallContext,
        token: CancellationToken,
    ) -> Result<T, WorkError>;
}

/// Runs `inner` inside `outer`.
pub struct PolicyWrap<O, I> {
    outer: O,
    inner: Arc<I>,
}

impl<O, I> PolicyWrap<O, I> {
    pub fn new(outer: O, inner: I) -> Self {
        Self {
            outer,
            inner: Arc::new(inner),
        }
    }

    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

#[async_trait]
impl<T, O, I> ExecutionPolicy<T> for PolicyWrap<O, I>
where
    T: Send + 'static,
    O: ExecutionPolicy<T>,
    I: ExecutionPolicy<T>,
{
    async fn execute(
        &self,
        work: WorkRef<T>,
        ctx: CallContext,
        token: CancellationToken,
    ) -> Result<T, WorkError> {
        let inner = Arc::clone(&self.inner);
        let through_inner: WorkRef<T> =
            WorkFn::arc(move |ctx: CallContext, token: CancellationToken| {
                let inner = Arc::clone(&inner);
                let work = Arc::clone(&work);
                async move { inner.execute(work, ctx, token).await }
            });
        self.outer.execute(through_inner, ctx, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::FallbackBulkhead;

    /// Retries once on a retryable error.
    struct RetryOnce;

    #[async_trait]
    impl<T: Send + 'static> ExecutionPolicy<T> for RetryOnce {
        async fn execute(
            &self,
            work: WorkRef<T>,
            ctx: CallContext,
            token: CancellationToken,
        ) -> Result<T, WorkError> {
            match work.call(ctx.clone(), token.clone()).await {
                Err(err) if err.is_retryable() => work.call(ctx, token).await,
                other => other,
            }
        }
    }

    #[tokio::test]
    async fn outer_policy_retries_through_the_bulkhead() {
        let bulkhead = FallbackBulkhead::<u32>::unbounded(1).expect("build");
        let policy = PolicyWrap::new(RetryOnce, bulkhead);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let flaky: WorkRef<u32> =
            WorkFn::arc(move |_ctx: CallContext, _t: CancellationToken| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err::<u32, _>(WorkError::fail("first call fails"))
                    } else {
                        Ok(9_u32)
                    }
                }
            });

        let out = policy
            .execute(flaky, CallContext::new(), CancellationToken::new())
            .await;
        assert_eq!(out, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(policy.inner().stats().executed, 2);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let policy = PolicyWrap::new(RetryOnce, FallbackBulkhead::<u32>::unbounded(2).expect("build"));
        let work: WorkRef<u32> = WorkFn::arc(|_ctx: CallContext, _t: CancellationToken| async {
            Err::<u32, _>(WorkError::fatal("bad input"))
        });

        let out = policy
            .execute(work, CallContext::new(), CancellationToken::new())
            .await;
        assert_eq!(out, Err(WorkError::fatal("bad input")));
        assert_eq!(policy.inner().stats().executed, 1);
    }
}
