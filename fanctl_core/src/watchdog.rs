//! Software watchdog window and its monitor thread.
//!
//! `SoftWatchdog` records the last refresh as milliseconds since its epoch.
//! The window is considered expired once more than `timeout_ms` has passed
//! without a refresh; the owner of the system then performs a full reset.
//! `WatchdogMonitor` polls the window from its own thread and latches a
//! "bitten" flag, the std stand-in for the hardware reset line. A loop that
//! is hung cannot consume that flag, so a bite still pending after a second
//! window escalates to an [`OnHang`] handler, normally [`exit_on_hang`].

use crate::controller::Command;
use crate::error::FanError;
use fanctl_traits::clock::Clock;
use fanctl_traits::{Actuator, Watchdog};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default watchdog window.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Process exit status after an unhandled watchdog expiry.
pub const HANG_EXIT_CODE: i32 = 5;

/// Runs on the monitor thread when the main loop never consumed a bite.
pub type OnHang = Box<dyn FnOnce(FanError) + Send + 'static>;

/// Std rendition of the hardware reset: drive the fan fully on through
/// `failsafe` if there is one, then terminate the process.
pub fn exit_on_hang(failsafe: Option<Box<dyn Actuator + Send>>) -> OnHang {
    Box::new(move |err| {
        if let Some(mut fan) = failsafe
            && let Err(e) = Command::Kick.apply(&mut fan)
        {
            tracing::error!(error = %e, "fail-safe drive failed");
        }
        tracing::error!(error = %err, code = HANG_EXIT_CODE, "control loop hung, terminating");
        std::process::exit(HANG_EXIT_CODE);
    })
}

#[derive(Debug, Clone)]
pub struct SoftWatchdog<C: Clock> {
    clock: C,
    epoch: Instant,
    timeout_ms: u64,
    last_refresh_ms: Arc<AtomicU64>,
}

impl<C: Clock> SoftWatchdog<C> {
    /// Arms the window; the first deadline is `timeout_ms` from now.
    pub fn new(clock: C, timeout_ms: u64) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            timeout_ms: timeout_ms.max(1),
            last_refresh_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Milliseconds since the last refresh.
    pub fn stalled_for(&self) -> u64 {
        let now = self.clock.ms_since(self.epoch);
        now.saturating_sub(self.last_refresh_ms.load(Ordering::Acquire))
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.stalled_for() > self.timeout_ms
    }
}

impl<C: Clock> Watchdog for SoftWatchdog<C> {
    fn refresh(&mut self) {
        let now = self.clock.ms_since(self.epoch);
        self.last_refresh_ms.store(now, Ordering::Release);
    }
}

/// Background thread polling a `SoftWatchdog`; joined on drop.
pub struct WatchdogMonitor {
    bitten: Arc<AtomicBool>,
    stalled_ms: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl WatchdogMonitor {
    /// Latch expiries only; a hung owner is never escalated.
    pub fn spawn<C: Clock + Send + Sync + 'static>(watchdog: SoftWatchdog<C>) -> Self {
        Self::start(watchdog, None)
    }

    /// Latch expiries, and hand a bite still pending once the stall exceeds
    /// twice the window to `on_hang`. The handler runs at most once.
    pub fn spawn_with_escalation<C: Clock + Send + Sync + 'static>(
        watchdog: SoftWatchdog<C>,
        on_hang: OnHang,
    ) -> Self {
        Self::start(watchdog, Some(on_hang))
    }

    fn start<C: Clock + Send + Sync + 'static>(
        watchdog: SoftWatchdog<C>,
        mut on_hang: Option<OnHang>,
    ) -> Self {
        let bitten = Arc::new(AtomicBool::new(false));
        let bitten_clone = bitten.clone();
        let stalled_ms = Arc::new(AtomicU64::new(0));
        let stalled_clone = stalled_ms.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        // Poll several times per window so expiry is noticed promptly
        let poll = Duration::from_millis((watchdog.timeout_ms() / 8).clamp(1, 100));
        let hang_after = watchdog.timeout_ms().saturating_mul(2);

        let join_handle = std::thread::spawn(move || {
            while !shutdown_clone.load(Ordering::Relaxed) {
                if watchdog.expired() && !bitten_clone.load(Ordering::Acquire) {
                    let stalled = watchdog.stalled_for();
                    stalled_clone.store(stalled, Ordering::Relaxed);
                    bitten_clone.store(true, Ordering::Release);
                    tracing::warn!(stalled_ms = stalled, "watchdog expired");
                }
                if on_hang.is_some() && bitten_clone.load(Ordering::Acquire) {
                    let stalled = watchdog.stalled_for();
                    if stalled > hang_after
                        && let Some(escalate) = on_hang.take()
                    {
                        tracing::error!(stalled_ms = stalled, "watchdog bite not handled");
                        escalate(FanError::WatchdogExpired {
                            stalled_ms: stalled,
                        });
                    }
                }
                std::thread::sleep(poll);
            }
            tracing::trace!("watchdog monitor exiting cleanly");
        });

        Self {
            bitten,
            stalled_ms,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Consume a latched expiry; returns the stall length that caused it.
    pub fn take_bite(&self) -> Option<u64> {
        if self.bitten.swap(false, Ordering::AcqRel) {
            Some(self.stalled_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}

impl Drop for WatchdogMonitor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "watchdog monitor panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanctl_traits::ManualClock;

    #[test]
    fn expires_only_after_window() {
        let clock = ManualClock::new();
        let mut wd = SoftWatchdog::new(clock.clone(), 2_000);
        clock.advance(Duration::from_millis(2_000));
        assert!(!wd.expired());
        clock.advance(Duration::from_millis(1));
        assert!(wd.expired());
        wd.refresh();
        assert!(!wd.expired());
        assert_eq!(wd.stalled_for(), 0);
    }

    #[test]
    fn clones_share_refresh_state() {
        let clock = ManualClock::new();
        let mut wd = SoftWatchdog::new(clock.clone(), 100);
        let observer = wd.clone();
        clock.advance(Duration::from_millis(150));
        assert!(observer.expired());
        wd.refresh();
        assert!(!observer.expired());
    }

    #[test]
    fn monitor_latches_expiry() {
        let clock = ManualClock::new();
        let wd = SoftWatchdog::new(clock.clone(), 50);
        let monitor = WatchdogMonitor::spawn(wd.clone());
        clock.advance(Duration::from_millis(500));
        let mut bite = None;
        for _ in 0..200 {
            bite = monitor.take_bite();
            if bite.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(bite.is_some_and(|ms| ms >= 500));
    }

    #[test]
    fn pending_bite_escalates_once() {
        let clock = ManualClock::new();
        let wd = SoftWatchdog::new(clock.clone(), 50);
        let (tx, rx) = crossbeam_channel::unbounded();
        let _monitor = WatchdogMonitor::spawn_with_escalation(
            wd.clone(),
            Box::new(move |e| {
                let _ = tx.send(e);
            }),
        );
        clock.advance(Duration::from_millis(80));
        // Latched but still inside the second window
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        clock.advance(Duration::from_millis(500));
        let err = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(err, FanError::WatchdogExpired { stalled_ms } if stalled_ms >= 580));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn consumed_bite_does_not_escalate() {
        let clock = ManualClock::new();
        let mut wd = SoftWatchdog::new(clock.clone(), 50);
        let (tx, rx) = crossbeam_channel::unbounded();
        let monitor = WatchdogMonitor::spawn_with_escalation(
            wd.clone(),
            Box::new(move |e| {
                let _ = tx.send(e);
            }),
        );
        clock.advance(Duration::from_millis(80));
        let mut bite = None;
        for _ in 0..200 {
            bite = monitor.take_bite();
            if bite.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(bite.is_some());
        wd.refresh();
        clock.advance(Duration::from_millis(40));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
