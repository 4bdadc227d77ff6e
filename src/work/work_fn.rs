//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(CallContext, CancellationToken) -> Fut`,
//! producing a fresh future per call. No hidden mutation happens between calls;
//! share state explicitly through `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use fallback_bulkhead::{CallContext, WorkError, WorkFn, WorkRef};
//!
//! let w: WorkRef<u32> = WorkFn::arc(|_ctx: CallContext, _token: CancellationToken| async move {
//!     Ok::<_, WorkError>(42)
//! });
//! # let _ = w;
//! ```

use std::{future::Future, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{
    error::WorkError,
    work::{BoxWorkFuture, CallContext, Work},
};

/// Function-backed computation.
#[derive(Debug, Clone)]
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    /// Wraps a closure.
    ///
    /// Prefer [`WorkFn::arc`] when you immediately need a [`WorkRef`](crate::WorkRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<T, F, Fut> Work<T> for WorkFn<F>
where
    F: Fn(CallContext, CancellationToken) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
{
    fn call(&self, ctx: CallContext, token: CancellationToken) -> BoxWorkFuture<T> {
        Box::pin((self.f)(ctx, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkRef;

    #[tokio::test]
    async fn each_call_builds_a_fresh_future() {
        let w: WorkRef<String> = WorkFn::arc(|ctx: CallContext, _t: CancellationToken| async move {
            Ok::<_, WorkError>(ctx.get("user").unwrap_or("anon").to_string())
        });

        let token = CancellationToken::new();
        let first = w
            .call(CallContext::new().with("user", "ada"), token.clone())
            .await;
        let second = w.call(CallContext::new(), token).await;

        assert_eq!(first, Ok("ada".to_string()));
        assert_eq!(second, Ok("anon".to_string()));
    }
}
