//! Error types used by the bulkhead and the work it runs.
//!
//! This module defines three error enums:
//!
//! - [`ConfigError`] — invalid construction arguments, raised synchronously by the builder.
//! - [`SubmitError`] — a submission was refused outright (the bulkhead is disposed).
//! - [`WorkError`] — the outcome of one work item that did not produce a value.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! [`WorkError`] additionally offers [`WorkError::is_retryable`] for outer retry layers.

use std::sync::Arc;

use thiserror::Error;

/// # Errors produced while building a bulkhead.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_parallelization` must be greater than zero.
    #[error("max_parallelization must be greater than zero")]
    ZeroParallelization,

    /// `max_parallelization` exceeds what the permit pool can represent.
    #[error("max_parallelization must not exceed {max}")]
    ParallelizationTooLarge {
        /// Largest supported value.
        max: usize,
    },

    /// Every queue limit must be greater than zero.
    #[error("queue limit at index {index} must be greater than zero")]
    ZeroQueueLimit {
        /// Position of the offending value in the configured limits.
        index: usize,
    },

    /// No fallback handler was supplied.
    #[error("fallback handler is required")]
    MissingFallback,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fallback_bulkhead::ConfigError;
    ///
    /// assert_eq!(ConfigError::ZeroParallelization.as_label(), "config_zero_parallelization");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroParallelization => "config_zero_parallelization",
            ConfigError::ParallelizationTooLarge { .. } => "config_parallelization_too_large",
            ConfigError::ZeroQueueLimit { .. } => "config_zero_queue_limit",
            ConfigError::MissingFallback => "config_missing_fallback",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConfigError::ZeroParallelization => "max_parallelization=0".to_string(),
            ConfigError::ParallelizationTooLarge { max } => {
                format!("max_parallelization above {max}")
            }
            ConfigError::ZeroQueueLimit { index } => format!("queue_limits[{index}]=0"),
            ConfigError::MissingFallback => "fallback handler missing".to_string(),
        }
    }
}

/// Error returned by [`FallbackBulkhead::submit`](crate::FallbackBulkhead::submit).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The bulkhead was disposed; no new work is accepted.
    #[error("bulkhead disposed")]
    Disposed,
}

impl From<SubmitError> for WorkError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Disposed => WorkError::Disposed,
        }
    }
}

/// # Outcome of a work item that did not produce a value.
///
/// `WorkError` is `Clone` so that a single fallback handler failure can be
/// delivered to every item of the batch it left unresolved.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// The computation failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: Arc<str>,
    },

    /// The computation failed and should not be retried.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: Arc<str>,
    },

    /// The item's cancellation token fired before it was started,
    /// or the computation itself reported cancellation.
    #[error("context cancelled")]
    Canceled,

    /// The fallback handler failed for the batch that contained this item.
    #[error("fallback handler failed: {error}")]
    FallbackFailed {
        /// Rendered handler error.
        error: Arc<str>,
    },

    /// The fallback handler chose to reject this item.
    #[error("rejected by fallback: {reason}")]
    Rejected {
        /// Handler-supplied reason.
        reason: Arc<str>,
    },

    /// The bulkhead was disposed before the item could be started.
    #[error("bulkhead disposed")]
    Disposed,

    /// The item was released without ever being resolved.
    #[error("work item left unresolved")]
    Unresolved,

    /// The computation panicked.
    #[error("computation panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: Arc<str>,
    },
}

impl WorkError {
    /// Shorthand for a retryable [`WorkError::Fail`].
    ///
    /// # Example
    /// ```
    /// use fallback_bulkhead::WorkError;
    ///
    /// let err = WorkError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl Into<Arc<str>>) -> Self {
        WorkError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for a non-retryable [`WorkError::Fatal`].
    pub fn fatal(error: impl Into<Arc<str>>) -> Self {
        WorkError::Fatal {
            error: error.into(),
        }
    }

    /// Shorthand for [`WorkError::Rejected`], for use by fallback handlers.
    pub fn rejected(reason: impl Into<Arc<str>>) -> Self {
        WorkError::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fallback_bulkhead::WorkError;
    ///
    /// assert_eq!(WorkError::Canceled.as_label(), "work_canceled");
    /// assert_eq!(WorkError::fail("boom").as_label(), "work_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Fatal { .. } => "work_fatal",
            WorkError::Canceled => "work_canceled",
            WorkError::FallbackFailed { .. } => "work_fallback_failed",
            WorkError::Rejected { .. } => "work_rejected",
            WorkError::Disposed => "work_disposed",
            WorkError::Unresolved => "work_unresolved",
            WorkError::Panicked { .. } => "work_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkError::Fail { error } => format!("error: {error}"),
            WorkError::Fatal { error } => format!("fatal: {error}"),
            WorkError::Canceled => "context cancelled".to_string(),
            WorkError::FallbackFailed { error } => format!("fallback: {error}"),
            WorkError::Rejected { reason } => format!("rejected: {reason}"),
            WorkError::Disposed => "disposed".to_string(),
            WorkError::Unresolved => "unresolved".to_string(),
            WorkError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Indicates whether an outer retry layer may safely retry this outcome.
    ///
    /// Returns `true` for [`WorkError::Fail`] and [`WorkError::FallbackFailed`],
    /// `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use fallback_bulkhead::WorkError;
    ///
    /// assert!(WorkError::fail("boom").is_retryable());
    /// assert!(!WorkError::fatal("nope").is_retryable());
    /// assert!(!WorkError::Disposed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkError::Fail { .. } | WorkError::FallbackFailed { .. }
        )
    }

    /// Builds the error delivered to items a failed fallback handler left unresolved.
    pub(crate) fn from_handler(err: &anyhow::Error) -> Self {
        WorkError::FallbackFailed {
            error: format!("{err:#}").into(),
        }
    }

    /// Builds a [`WorkError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        WorkError::Panicked {
            info: panic_message(payload).into(),
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
