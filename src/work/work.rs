//! # Work abstraction.
//!
//! [`Work`] is an async, cancelable computation producing a `T`. It is invoked
//! with the submission's [`CallContext`] and [`CancellationToken`]; honoring the
//! token once started is the computation's own responsibility.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::{error::WorkError, work::CallContext};

/// Boxed future returned by [`Work::call`].
pub type BoxWorkFuture<T> = Pin<Box<dyn Future<Output = Result<T, WorkError>> + Send + 'static>>;

/// Shared handle to a computation.
pub type WorkRef<T> = Arc<dyn Work<T>>;

/// # Asynchronous, cancelable computation.
///
/// Each [`call`](Work::call) must produce a **fresh** future, so the same
/// computation can be run again (for example by a fallback handler that
/// decides to execute an overflow item elsewhere).
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use fallback_bulkhead::{BoxWorkFuture, CallContext, Work, WorkError};
///
/// struct Ping;
///
/// impl Work<&'static str> for Ping {
///     fn call(&self, _ctx: CallContext, token: CancellationToken) -> BoxWorkFuture<&'static str> {
///         Box::pin(async move {
///             if token.is_cancelled() {
///                 return Err(WorkError::Canceled);
///             }
///             Ok("pong")
///         })
///     }
/// }
/// ```
pub trait Work<T>: Send + Sync + 'static {
    /// Starts one execution of the computation.
    fn call(&self, ctx: CallContext, token: CancellationToken) -> BoxWorkFuture<T>;
}
