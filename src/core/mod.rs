//! Bulkhead core: admission, queueing, draining and fallback.
//!
//! The public API from this module is [`FallbackBulkhead`] with its
//! [`BulkheadBuilder`], the fallback handler types and [`BulkheadStats`].
//!
//! Internal modules:
//! - [`gate`]: non-blocking permit pool (at most `max_parallelization` drain loops);
//! - [`queue`]: FIFO queue with threshold evaluation and batch removal;
//! - [`dispatch`]: drain loops, race-closure re-check, disposal of stranded work;
//! - [`fallback`]: batch hand-off to the handler and failure fan-out;
//! - [`bulkhead`]: the façade tying them together;
//! - [`stats`]: counters.

mod builder;
mod bulkhead;
mod dispatch;
mod fallback;
mod gate;
mod queue;
mod stats;

pub use builder::BulkheadBuilder;
pub use bulkhead::FallbackBulkhead;
pub use fallback::{FallbackBatch, FallbackFuture, FallbackHandler, FallbackRef, RejectAll};
pub use stats::BulkheadStats;
