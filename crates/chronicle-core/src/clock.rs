//! Time source used when stamping recorded events and snapshots.

use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// Stores take the clock as a dependency so tests can pin `recorded_at`
/// and `taken_at` values instead of reading wall time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation for production use.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
