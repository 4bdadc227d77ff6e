//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that
//! fans bulkhead events out to user-supplied subscribers.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   submit / drain / fallback ── publish(Event) ──► Bus ──► subscriber listener
//!                                                              │
//!                                                              ▼
//!                                                        SubscriberSet
//!                                                   ┌──────────┼──────────┐
//!                                                   ▼          ▼          ▼
//!                                               LogWriter   Metrics    Custom
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
