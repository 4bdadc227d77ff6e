//! # LogWriter — simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [queued] item=12 depth=3
//! [starting] item=12 waited_ms=40
//! [completed] item=12
//! [diverted] batch=100 depth=0
//! [fallback-failed] batch=100 unresolved=100 err="sink unavailable"
//! [drain-stopped] processed=57
//! [disposed]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::WorkQueued => {
                println!("[queued] item={:?} depth={:?}", e.item, e.depth);
            }
            EventKind::WorkStarting => {
                println!("[starting] item={:?} waited_ms={:?}", e.item, e.waited_ms);
            }
            EventKind::WorkCompleted => {
                println!("[completed] item={:?}", e.item);
            }
            EventKind::WorkFailed => {
                println!("[failed] item={:?} err={:?}", e.item, e.reason);
            }
            EventKind::WorkCanceled => {
                println!("[canceled] item={:?}", e.item);
            }
            EventKind::WorkDisposed => {
                println!("[work-disposed] count={:?}", e.batch);
            }
            EventKind::BatchDiverted => {
                println!("[diverted] batch={:?} depth={:?}", e.batch, e.depth);
            }
            EventKind::FallbackCompleted => {
                println!(
                    "[fallback-completed] batch={:?} unresolved={:?}",
                    e.batch, e.unresolved
                );
            }
            EventKind::FallbackFailed => {
                println!(
                    "[fallback-failed] batch={:?} unresolved={:?} err={:?}",
                    e.batch, e.unresolved, e.reason
                );
            }
            EventKind::DrainStarted => {
                println!("[drain-started]");
            }
            EventKind::DrainStopped => {
                println!("[drain-stopped] processed={:?}", e.processed);
            }
            EventKind::Disposed => {
                println!("[disposed]");
            }
            EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-overflow] subscriber={:?} reason={:?}",
                    e.subscriber, e.reason
                );
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={} info={}",
                    e.subscriber.unwrap_or("unknown"),
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
