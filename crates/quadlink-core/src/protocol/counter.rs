//! Shared counter of received telemetry datagrams.
//!
//! # Why an atomic? (for beginners)
//!
//! The telemetry receiver increments the counter from its own task while
//! callers may read it from anywhere (a status display, a test, a shutdown
//! summary).  `AtomicU64` lets both sides touch the value without a lock:
//! each increment is a single indivisible read-modify-write, so no update is
//! ever lost and no reader ever sees a torn value.
//!
//! The counter is a statistic, not a synchronisation primitive, so every
//! access uses `Ordering::Relaxed`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic count of datagrams received during a session.
///
/// # Examples
///
/// ```rust
/// use quadlink_core::PacketCounter;
///
/// let counter = PacketCounter::new();
/// assert_eq!(counter.increment(), 1);
/// assert_eq!(counter.increment(), 2);
/// assert_eq!(counter.current(), 2);
/// ```
#[derive(Debug, Default)]
pub struct PacketCounter {
    inner: AtomicU64,
}

impl PacketCounter {
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Records one datagram and returns the new total.
    ///
    /// The first call returns 1, so `total % n == 0` marks every n-th datagram.
    pub fn increment(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Returns the total without changing it.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
