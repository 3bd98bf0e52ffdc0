//! Common time/period helpers for fanctl_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Tick period of an 8-bit timer overflow (8 MHz / 1024 / 256 ≈ 30.5 Hz).
pub const DEFAULT_TICK_MS: u64 = 33;

/// Compute the tick rate in Hz for a given tick period in milliseconds.
/// - Clamps `tick_ms` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 Hz.
#[inline]
pub fn tick_hz(tick_ms: u64) -> u64 {
    (MILLIS_PER_SEC / tick_ms.max(1)).max(1)
}

/// Number of whole ticks that fit in `window_ms`, at least 1.
#[inline]
pub fn ticks_in(window_ms: u64, tick_ms: u64) -> u64 {
    (window_ms / tick_ms.max(1)).max(1)
}
