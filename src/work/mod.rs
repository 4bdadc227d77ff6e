//! # Work abstractions.
//!
//! This module provides the work-related types:
//! - [`Work`] - trait for implementing async cancelable computations
//! - [`WorkFn`] - function-backed work implementation
//! - [`WorkRef`] - shared reference to a computation (`Arc<dyn Work<T>>`)
//! - [`CallContext`] - call-scoped key/value bag passed to each computation
//! - [`PendingWork`] - one queued submission with its single-assignment result slot
//! - [`WorkHandle`] - the caller side of that slot

mod context;
mod pending;
mod work;
mod work_fn;

pub use context::CallContext;
pub use pending::{PendingWork, WorkHandle};
pub use work::{BoxWorkFuture, Work, WorkRef};
pub use work_fn::WorkFn;
