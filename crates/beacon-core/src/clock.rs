//! Wall-clock capability
//!
//! The engine and the collector store both need "now" for failure-window
//! arithmetic and `last_seen` stamping. Reading the system clock directly
//! would scatter untestable time reads through control flow, so the read
//! goes through this trait and tests substitute a manual clock.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time
///
/// Implementations must be cheap to call; the engine reads the clock once
/// per failed send and the store once per accepted report.
pub trait Clock: Send + Sync {
    /// Current time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
