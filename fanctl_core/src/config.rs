//! Runtime configuration for the control loop.
//!
//! These are the structs consumed by `runner`. They are separate from the
//! TOML-deserialized config in `fanctl_config`; control thresholds are not
//! configurable at all and live as constants in `controller`.

use crate::util::DEFAULT_TICK_MS;
use crate::watchdog::DEFAULT_TIMEOUT_MS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCfg {
    /// Scheduler tick period in milliseconds.
    pub tick_ms: u64,
    /// Watchdog window in milliseconds.
    pub watchdog_ms: u64,
    /// Stop after this many ticks; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            watchdog_ms: DEFAULT_TIMEOUT_MS,
            max_ticks: None,
        }
    }
}
