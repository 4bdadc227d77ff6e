//! # Admission gate: the bulkhead's permit pool.
//!
//! A counting pool of `max_parallelization` permits backed by
//! [`tokio::sync::Semaphore`]. Acquisition is **never** a wait: a caller either
//! wins a permit right now or learns that the pool is busy or closed.
//!
//! ## Rules
//! - Held permits never exceed capacity (the semaphore enforces it).
//! - A permit is returned by dropping it; there is no explicit release call to misuse.
//! - [`close`](AdmissionGate::close) happens once; later calls report `false`.
//!   Permits already held stay valid until dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::error::ConfigError;

/// Execution permit; dropping it returns the slot to the gate.
pub(crate) type Permit = OwnedSemaphorePermit;

/// Outcome of a non-blocking acquisition.
#[derive(Debug)]
pub(crate) enum Admission {
    /// The caller now owns a permit and with it a drain loop.
    Granted(Permit),
    /// Every permit is held.
    Busy,
    /// The gate was closed by disposal.
    Closed,
}

#[derive(Debug)]
pub(crate) struct AdmissionGate {
    sem: Arc<Semaphore>,
    capacity: usize,
    closed: AtomicBool,
}

impl AdmissionGate {
    pub(crate) fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroParallelization);
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ParallelizationTooLarge {
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
            closed: AtomicBool::new(false),
        })
    }

    /// Tries to take one permit without suspending.
    pub(crate) fn try_acquire(&self) -> Admission {
        match Arc::clone(&self.sem).try_acquire_owned() {
            Ok(permit) => Admission::Granted(permit),
            Err(TryAcquireError::NoPermits) => Admission::Busy,
            Err(TryAcquireError::Closed) => Admission::Closed,
        }
    }

    /// Permits not currently held; `0` once closed.
    pub(crate) fn available(&self) -> usize {
        if self.is_closed() {
            0
        } else {
            self.sem.available_permits()
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Closes the gate. Returns `true` only for the call that actually closed it.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.sem.close();
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_a_config_error() {
        assert_eq!(
            AdmissionGate::new(0).unwrap_err(),
            ConfigError::ZeroParallelization
        );
    }

    #[test]
    fn never_grants_more_than_capacity() {
        let gate = AdmissionGate::new(2).expect("gate");

        let a = gate.try_acquire();
        let b = gate.try_acquire();
        assert!(matches!(a, Admission::Granted(_)));
        assert!(matches!(b, Admission::Granted(_)));
        assert!(matches!(gate.try_acquire(), Admission::Busy));
        assert_eq!(gate.available(), 0);

        drop(a);
        assert_eq!(gate.available(), 1);
        assert!(matches!(gate.try_acquire(), Admission::Granted(_)));
    }

    #[test]
    fn close_is_reported_once_and_refuses_new_permits() {
        let gate = AdmissionGate::new(3).expect("gate");
        let held = gate.try_acquire();

        assert!(gate.close());
        assert!(!gate.close());
        assert!(gate.is_closed());
        assert!(matches!(gate.try_acquire(), Admission::Closed));
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.capacity(), 3);

        // A permit taken before closing is still valid and drops cleanly.
        assert!(matches!(held, Admission::Granted(_)));
        drop(held);
    }
}
