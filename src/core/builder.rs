use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    config::BulkheadConfig,
    error::ConfigError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{
    bulkhead::{FallbackBulkhead, Shared},
    fallback::{FallbackHandler, FallbackRef},
    gate::AdmissionGate,
    queue::OverflowQueue,
    stats::StatsCounters,
};

/// Builder for constructing a [`FallbackBulkhead`] with optional features.
pub struct BulkheadBuilder<T> {
    cfg: BulkheadConfig,
    fallback: Option<FallbackRef<T>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<T: Send + 'static> BulkheadBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BulkheadConfig) -> Self {
        Self {
            cfg,
            fallback: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the handler that receives diverted batches. Required.
    pub fn with_fallback<H>(self, handler: H) -> Self
    where
        H: FallbackHandler<T>,
    {
        self.with_fallback_ref(Arc::new(handler))
    }

    /// Same as [`with_fallback`](Self::with_fallback) for an already shared handler.
    pub fn with_fallback_ref(mut self, handler: FallbackRef<T>) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive bulkhead events (queueing, diversions, failures, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates the configuration and builds the bulkhead.
    ///
    /// With subscribers configured this spawns their workers and a listener,
    /// so it must then be called from within a tokio runtime.
    pub fn build(self) -> Result<FallbackBulkhead<T>, ConfigError> {
        self.cfg.validate()?;
        let fallback = self.fallback.ok_or(ConfigError::MissingFallback)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let lifecycle = CancellationToken::new();
        let shared = Arc::new(Shared {
            queue: OverflowQueue::new(self.cfg.sorted_limits(), self.cfg.overflow_mode),
            gate: AdmissionGate::new(self.cfg.max_parallelization)?,
            fallback,
            bus: bus.clone(),
            stats: StatsCounters::default(),
            evaluate_on_submit: self.cfg.evaluate_on_submit,
            lifecycle: lifecycle.clone(),
        });

        if !self.subscribers.is_empty() {
            subscriber_listener(SubscriberSet::new(self.subscribers, bus.clone()), bus, lifecycle);
        }
        Ok(FallbackBulkhead::from_shared(shared))
    }
}

/// Forwards bus events to the subscriber set until the bulkhead is dropped.
fn subscriber_listener(set: SubscriberSet, bus: Bus, lifecycle: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = lifecycle.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}
