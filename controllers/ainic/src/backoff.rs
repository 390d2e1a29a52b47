//! # Exponential Backoff
//!
//! Retry delays for failed reconcile passes. The delay doubles with every
//! consecutive failure of the same object and is capped, so a broken object
//! keeps being retried without hammering the API server.
//!
//! Default sequence: 5s, 10s, 20s, 40s, 80s, 160s, 300s (max).

use std::time::Duration;

/// Delay before the first retry
pub const DEFAULT_BASE: Duration = Duration::from_secs(5);

/// Upper bound for any retry delay
pub const DEFAULT_MAX: Duration = Duration::from_secs(300);

/// Stateless exponential backoff calculator
///
/// Per-object failure counts are kept by the caller; this type only maps a
/// count to a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `base` and never exceeding `max`
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay for the given number of consecutive failures
    ///
    /// `error_count` is 1 for the first failure. A count of 0 is treated as 1.
    #[must_use]
    pub fn delay_for(&self, error_count: u32) -> Duration {
        // 2^16 * base is far beyond any sane cap; stop shifting there
        let exponent = error_count.saturating_sub(1).min(16);
        self.base.saturating_mul(1 << exponent).min(self.max)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE, DEFAULT_MAX)
    }
}
