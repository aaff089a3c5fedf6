//! General time utility functions
//!
//! Control timestamps come from a free-running 32 bit microsecond counter,
//! which wraps roughly every 71.6 minutes. All differences between two
//! counter readings must therefore be taken with [`ticks_diff`] rather than
//! plain subtraction.

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of microseconds in a second
pub const MICROS_PER_SECOND: f64 = 1E6;

/// A reading of the microsecond tick counter.
pub type Ticks = u32;

/// Largest modular difference accepted as forward progress of the counter.
pub const MAX_FORWARD_TICKS: Ticks = Ticks::MAX / 2;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of ticks elapsed between `old` and `new`.
///
/// The subtraction is modular so a pair of readings straddling the counter
/// overflow still produces the (small) forward difference.
pub fn ticks_diff(new: Ticks, old: Ticks) -> Ticks {
    new.wrapping_sub(old)
}

/// Elapsed time in seconds between two tick readings.
pub fn ticks_diff_s(new: Ticks, old: Ticks) -> f64 {
    ticks_diff(new, old) as f64 / MICROS_PER_SECOND
}

/// Elapsed time in seconds between two tick readings, or `None` if `new` is
/// older than `old`.
///
/// A modular difference of more than half the counter range can only come
/// from a stale (out of order) reading, the counter never goes that long
/// between two control cycles.
pub fn ticks_diff_checked_s(new: Ticks, old: Ticks) -> Option<f64> {
    let diff = ticks_diff(new, old);

    if diff > MAX_FORWARD_TICKS {
        None
    }
    else {
        Some(diff as f64 / MICROS_PER_SECOND)
    }
}

/// Advance a tick reading by a number of seconds, wrapping at the counter
/// limit.
///
/// `seconds` must be finite, non-negative and no more than
/// [`MAX_FORWARD_TICKS`] microseconds, anything else cannot be represented as
/// forward progress of the counter.
pub fn ticks_add_s(ticks: Ticks, seconds: f64) -> Ticks {
    let micros = (seconds * MICROS_PER_SECOND).round();
    debug_assert!(
        micros >= 0.0 && micros <= MAX_FORWARD_TICKS as f64,
        "Cannot advance the tick counter by {} s",
        seconds
    );

    ticks.wrapping_add(micros as Ticks)
}
