//! # Bulkhead configuration.
//!
//! Provides [`BulkheadConfig`], the centralized settings for one bulkhead instance,
//! and [`OverflowMode`], which selects how a threshold breach carves a batch
//! out of the queue.
//!
//! ## Sentinel values
//! - `queue_limits = []` → unbounded queue, work is never diverted
//! - `bus_capacity = 0` → clamped to 1

use std::num::NonZeroUsize;
use std::thread;

use tokio::sync::Semaphore;

use crate::error::ConfigError;

/// How a breached threshold removes items from the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowMode {
    /// Remove exactly `t` oldest items, where `t` is the largest breached limit.
    #[default]
    Chunk,

    /// Take the whole backing store, leaving an empty queue behind.
    Swap,
}

/// Configuration for a [`FallbackBulkhead`](crate::FallbackBulkhead).
///
/// ## Field semantics
/// - `max_parallelization`: maximum number of computations running at once (must be `> 0`)
/// - `queue_limits`: depth thresholds that divert overflow to the fallback handler (each `> 0`)
/// - `overflow_mode`: batch shape on breach, see [`OverflowMode`]
/// - `evaluate_on_submit`: check thresholds on every append, not only inside drain loops
/// - `bus_capacity`: event bus ring buffer size (min 1)
///
/// ## Notes
/// All fields are public for flexibility. Call [`BulkheadConfig::validate`]
/// (the builder does) before relying on them.
#[derive(Clone, Debug)]
pub struct BulkheadConfig {
    /// Maximum number of computations executing concurrently.
    pub max_parallelization: usize,

    /// Queue depth thresholds.
    ///
    /// When the queue depth meets or exceeds one of them, the largest met limit
    /// decides the size of the batch handed to the fallback handler. Order and
    /// duplicates do not matter.
    pub queue_limits: Vec<usize>,

    /// Shape of a diverted batch.
    pub overflow_mode: OverflowMode,

    /// Evaluate thresholds right after each append.
    ///
    /// With `false`, only drain loops evaluate thresholds. The queue can then
    /// grow past a smaller limit while every permit is busy, so graduated limits
    /// such as `[10, 100]` actually produce 100-item batches.
    pub evaluate_on_submit: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl BulkheadConfig {
    /// Creates a configuration with the given concurrency cap and queue limits.
    pub fn new(max_parallelization: usize, queue_limits: Vec<usize>) -> Self {
        Self {
            max_parallelization,
            queue_limits,
            ..Self::default()
        }
    }

    /// Checks the constructor invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallelization == 0 {
            return Err(ConfigError::ZeroParallelization);
        }
        if self.max_parallelization > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ParallelizationTooLarge {
                max: Semaphore::MAX_PERMITS,
            });
        }
        if let Some(index) = self.queue_limits.iter().position(|&l| l == 0) {
            return Err(ConfigError::ZeroQueueLimit { index });
        }
        Ok(())
    }

    /// Returns queue limits sorted in descending order with duplicates removed.
    pub fn sorted_limits(&self) -> Vec<usize> {
        let mut limits = self.queue_limits.clone();
        limits.sort_unstable_by(|a, b| b.cmp(a));
        limits.dedup();
        limits
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for BulkheadConfig {
    /// Default configuration:
    ///
    /// - `max_parallelization` = available parallelism (falls back to 1)
    /// - `queue_limits = []` (unbounded)
    /// - `overflow_mode = Chunk`
    /// - `evaluate_on_submit = true`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_parallelization: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            queue_limits: Vec::new(),
            overflow_mode: OverflowMode::default(),
            evaluate_on_submit: true,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_and_unbounded() {
        let cfg = BulkheadConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.max_parallelization >= 1);
        assert!(cfg.sorted_limits().is_empty());
    }

    #[test]
    fn rejects_zero_parallelization() {
        let cfg = BulkheadConfig::new(0, vec![10]);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroParallelization));
    }

    #[test]
    fn rejects_parallelization_beyond_permit_pool() {
        let cfg = BulkheadConfig::new(usize::MAX, Vec::new());
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ParallelizationTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_zero_limit_with_position() {
        let cfg = BulkheadConfig::new(2, vec![10, 0, 5]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroQueueLimit { index: 1 })
        );
    }

    #[test]
    fn limits_sorted_descending_without_duplicates() {
        let cfg = BulkheadConfig::new(1, vec![10, 100, 10, 50]);
        assert_eq!(cfg.sorted_limits(), vec![100, 50, 10]);
    }

    #[test]
    fn bus_capacity_never_zero() {
        let cfg = BulkheadConfig {
            bus_capacity: 0,
            ..BulkheadConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
