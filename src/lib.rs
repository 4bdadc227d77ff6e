//! # fallback-bulkhead
//!
//! **fallback-bulkhead** is a concurrency-limiting executor for async Rust.
//!
//! It runs at most `max_parallelization` computations at once. Submissions never
//! wait: they join a FIFO queue, and when the queue grows past a configured
//! threshold the oldest items are handed **as a batch** to a caller-supplied
//! fallback handler, which decides their outcome (substitute value, rejection,
//! or running them elsewhere). The crate is meant as one stage of a larger
//! resilience pipeline; see [`ExecutionPolicy`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   submit()      submit()      submit()         (many callers, never blocking)
//!      │             │             │
//!      ▼             ▼             ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  FallbackBulkhead                                                 │
//! │  - OverflowQueue (FIFO + threshold evaluation, one mutex)         │
//! │  - AdmissionGate (max_parallelization permits, try-acquire only)  │
//! │  - Bus (broadcast events) ──► SubscriberSet (per-sub queues)      │
//! └──────┬───────────────────────────────────────────────┬────────────┘
//!        │ permit won                                    │ limit breached
//!        ▼                                               ▼
//!  ┌──────────────┐  ┌──────────────┐          ┌───────────────────┐
//!  │ drain loop 1 │  │ drain loop N │          │ FallbackHandler   │
//!  │ (sequential) │  │ (sequential) │          │ (one call/batch,  │
//!  └──────┬───────┘  └──────┬───────┘          │  no permit used)  │
//!         │                 │                  └─────────┬─────────┘
//!         ▼                 ▼                            ▼
//!    resolve(item)     resolve(item)        complete / reject / execute(item)
//!         │                 │                            │
//!         └─────────────────┴──────────► WorkHandle ◄────┘
//! ```
//!
//! ### Item lifecycle
//! ```text
//! Created ──► Queued ──► Executing ──► Resolved
//!               │
//!               ├──► Diverted ──► FallbackPending ──► Resolved
//!               ├──► (token cancelled at dequeue) ──► Resolved(Canceled)
//!               └──► (bulkhead disposed)          ──► Resolved(Disposed)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                              |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Bulkhead**      | Bounded concurrency with non-blocking submission.            | [`FallbackBulkhead`], [`BulkheadBuilder`]       |
//! | **Overflow**      | Batched diversion of queue overflow.                         | [`FallbackHandler`], [`FallbackBatch`]          |
//! | **Work**          | Define computations as closures or trait objects.            | [`Work`], [`WorkFn`], [`WorkRef`]               |
//! | **Composition**   | Plug into (or wrap) an outer resilience pipeline.            | [`ExecutionPolicy`], [`PolicyWrap`]             |
//! | **Subscriber API**| Hook into bulkhead events (logging, metrics, custom).        | [`Subscribe`], [`Event`]                        |
//! | **Errors**        | Typed errors for construction, submission and outcomes.      | [`ConfigError`], [`SubmitError`], [`WorkError`] |
//! | **Configuration** | Centralize bulkhead settings.                                | [`BulkheadConfig`], [`OverflowMode`]            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use fallback_bulkhead::{
//!     BulkheadConfig, CallContext, FallbackBatch, FallbackBulkhead, WorkError, WorkFn, WorkRef,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn fallback_bulkhead::Subscribe>> = {
//!         use fallback_bulkhead::LogWriter;
//!         vec![Arc::new(LogWriter::default())]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn fallback_bulkhead::Subscribe>> = Vec::new();
//!
//!     // Overflow beyond 100 queued items is answered with a cached default.
//!     let bulkhead = FallbackBulkhead::builder(BulkheadConfig::new(4, vec![100]))
//!         .with_fallback(|batch: FallbackBatch<String>| async move {
//!             for item in batch.iter() {
//!                 item.complete("cached".to_string());
//!             }
//!             Ok(())
//!         })
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let greet: WorkRef<String> = WorkFn::arc(|ctx: CallContext, _t: CancellationToken| async move {
//!         Ok::<_, WorkError>(format!("hello, {}", ctx.get("user").unwrap_or("anon")))
//!     });
//!
//!     let handle = bulkhead.submit(
//!         greet,
//!         CallContext::new().with("user", "ada"),
//!         CancellationToken::new(),
//!     )?;
//!     assert_eq!(handle.await?, "hello, ada");
//!
//!     bulkhead.dispose();
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policy;
mod subscribers;
mod work;

// ---- Public re-exports ----

pub use config::{BulkheadConfig, OverflowMode};
pub use crate::core::{
    BulkheadBuilder, BulkheadStats, FallbackBatch, FallbackBulkhead, FallbackFuture,
    FallbackHandler, FallbackRef, RejectAll,
};
pub use error::{ConfigError, SubmitError, WorkError};
pub use events::{Event, EventKind};
pub use policy::{ExecutionPolicy, PolicyWrap};
pub use subscribers::{Subscribe, SubscriberSet};
pub use work::{BoxWorkFuture, CallContext, PendingWork, Work, WorkFn, WorkHandle, WorkRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
