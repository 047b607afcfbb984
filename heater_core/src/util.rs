//! Tick period helpers.

use std::time::Duration;

pub const MILLIS_PER_SEC: u64 = 1_000;

/// Tick period as a `Duration`, at least 1 ms.
#[inline]
pub fn tick_period(tick_ms: u64) -> Duration {
    Duration::from_millis(tick_ms.max(1))
}

/// Ticks per second for a period, rounded down, at least 1.
#[inline]
pub fn ticks_per_sec(tick_ms: u64) -> u64 {
    (MILLIS_PER_SEC / tick_ms.max(1)).max(1)
}

/// Microseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn as_micros_u64(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
