//! # Example: overflow_fallback
//!
//! A burst of 500 slow lookups against a bulkhead that runs 4 at a time and
//! diverts every 50 queued lookups to a fallback that answers from a cache.
//!
//! Demonstrates how to:
//! - Write a [`FallbackHandler`] as a closure over a [`FallbackBatch`].
//! - Resolve diverted items individually (cache hit) or run them anyway (miss).
//! - Read [`BulkheadStats`](fallback_bulkhead::BulkheadStats) after the burst.
//!
//! ## Run
//! ```bash
//! cargo run --example overflow_fallback
//! ```

use std::{collections::HashMap, sync::Arc, time::Duration};

use fallback_bulkhead::{CallContext, FallbackBatch, FallbackBulkhead, WorkError, WorkFn, WorkRef};
use tokio_util::sync::CancellationToken;

fn key_of(ctx: &CallContext) -> u32 {
    ctx.get("key").and_then(|k| k.parse().ok()).unwrap_or_default()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Even keys are cached.
    let cache: Arc<HashMap<u32, String>> =
        Arc::new((0..500).step_by(2).map(|k| (k, format!("cached-{k}"))).collect());

    let bulkhead = FallbackBulkhead::new(
        4,
        move |batch: FallbackBatch<String>| {
            let cache = Arc::clone(&cache);
            async move {
                println!("[fallback] batch of {}", batch.len());
                for item in batch.iter() {
                    match cache.get(&key_of(item.context())) {
                        Some(hit) => {
                            item.complete(hit.clone());
                        }
                        None => {
                            item.execute().await;
                        }
                    }
                }
                Ok(())
            }
        },
        vec![50],
    )?;

    let lookup: WorkRef<String> =
        WorkFn::arc(|ctx: CallContext, _token: CancellationToken| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, WorkError>(format!("fresh-{}", key_of(&ctx)))
        });

    let handles = (0..500_u32)
        .map(|k| {
            bulkhead.submit(
                Arc::clone(&lookup),
                CallContext::for_operation("lookup").with("key", k.to_string()),
                CancellationToken::new(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut cached = 0;
    for outcome in futures::future::join_all(handles).await {
        if outcome?.starts_with("cached-") {
            cached += 1;
        }
    }

    println!("cached answers: {cached}");
    println!("stats: {:?}", bulkhead.stats());
    Ok(())
}
