//! Timestamps and the injectable clock.
//!
//! Cached channel parameters carry a `last_update` timestamp; the refresh
//! policy compares it against the configured TTL. All staleness decisions go
//! through the [`Clock`] trait so tests can advance time without sleeping.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A point in time, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Milliseconds since the Unix epoch.
    pub ms: u64,
}

impl Timestamp {
    /// Create a timestamp with the given millisecond value.
    pub const fn new(ms: u64) -> Self {
        Self { ms }
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    pub const fn elapsed_since(self, earlier: Timestamp) -> u64 {
        self.ms.saturating_sub(earlier.ms)
    }

    /// Add milliseconds to this timestamp.
    pub const fn add_ms(self, ms: u64) -> Self {
        Self { ms: self.ms + ms }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.ms)
    }
}

/// Source of "now" for TTL evaluation.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source (default).
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Timestamp::new(ms)
    }
}

/// Manually advanced time source for tests.
///
/// Starts at a fixed epoch and only moves when told to, so staleness
/// windows can be crossed deterministically.
pub struct ManualClock {
    ms: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock at the given millisecond value.
    pub fn new(ms: u64) -> Self {
        Self {
            ms: AtomicU64::new(ms),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::Release);
    }

    /// Set the clock to an absolute millisecond value.
    pub fn set_ms(&self, ms: u64) {
        self.ms.store(ms, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.ms.load(Ordering::Acquire))
    }
}
