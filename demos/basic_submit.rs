//! # Example: basic_submit
//!
//! A handful of computations through a two-slot bulkhead, with the built-in
//! [`LogWriter`] printing every event.
//!
//! Demonstrates how to:
//! - Build a [`FallbackBulkhead`] with subscribers.
//! - Submit closures with a [`CallContext`] and await their handles.
//! - Dispose the bulkhead and observe that later submissions are refused.
//!
//! ## Flow
//! ```text
//! submit() x5 ──► OverflowQueue ──► drain loop 1 ──► WorkCompleted
//!                              └──► drain loop 2 ──► WorkCompleted
//! dispose()   ──► Disposed ──► submit() = Err(SubmitError::Disposed)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_submit --features logging
//! ```

use std::{sync::Arc, time::Duration};

use fallback_bulkhead::{
    BulkheadConfig, CallContext, FallbackBulkhead, LogWriter, RejectAll, Subscribe, WorkError,
};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let bulkhead = FallbackBulkhead::builder(BulkheadConfig::new(2, Vec::new()))
        .with_fallback(RejectAll)
        .with_subscribers(subs)
        .build()?;

    let mut handles = Vec::new();
    for i in 1..=5_u64 {
        let handle = bulkhead.submit_fn(
            move |ctx: CallContext, token: CancellationToken| async move {
                if token.is_cancelled() {
                    return Err(WorkError::Canceled);
                }
                tokio::time::sleep(Duration::from_millis(100 * i)).await;
                Ok(format!("{} #{i} done", ctx.operation_key().unwrap_or("job")))
            },
            CallContext::for_operation("resize"),
            CancellationToken::new(),
        )?;
        handles.push(handle);
    }

    for handle in handles {
        println!("{}", handle.await?);
    }
    println!("stats: {:?}", bulkhead.stats());

    bulkhead.dispose();
    let refused = bulkhead.submit_fn(
        |_ctx: CallContext, _token: CancellationToken| async { Ok(String::new()) },
        CallContext::new(),
        CancellationToken::new(),
    );
    println!("after dispose: {:?}", refused.err());

    // Let the LogWriter flush its queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
