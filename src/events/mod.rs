//! Bulkhead events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the bulkhead façade, drain loops,
//! the fallback dispatcher and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `FallbackBulkhead::submit`/`dispose`, `dispatch::drain`,
//!   `fallback::dispatch_batch`.
//! - **Consumers**: the bulkhead's subscriber listener (fans out to
//!   `SubscriberSet`) and anyone holding [`FallbackBulkhead::subscribe`](crate::FallbackBulkhead::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
