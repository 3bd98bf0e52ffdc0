use crate::config::RunCfg;
use crate::controller::FanState;
use crate::error::{FanError, Result as CoreResult};
use crate::sampler::{AdcWorker, SharedAverage, TemperatureSampler};
use crate::supervisor::{Supervisor, TickReport};
use crate::util::{tick_hz, ticks_in};
use crate::watchdog::{OnHang, SoftWatchdog, WatchdogMonitor, exit_on_hang};
use fanctl_traits::clock::{Clock, MonotonicClock};
use fanctl_traits::{Actuator, DiagnosticSink, ManualClock, TemperatureSensor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// What a run looked like when it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub resets: u32,
    pub sensor_failures: u64,
    pub final_state: FanState,
    pub final_average: u16,
    pub final_duty: u8,
}

/// Run the controller in real time until `shutdown` is set or
/// `cfg.max_ticks` is reached. The fan is left forced on afterwards.
///
/// A hung loop terminates the process with
/// [`HANG_EXIT_CODE`](crate::watchdog::HANG_EXIT_CODE).
pub fn run<S, A, D>(
    sensor: S,
    actuator: A,
    sink: D,
    cfg: &RunCfg,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary>
where
    S: TemperatureSensor + Send + 'static,
    A: Actuator,
    D: DiagnosticSink,
{
    run_supervised(
        sensor,
        actuator,
        sink,
        cfg,
        shutdown,
        MonotonicClock::new(),
        exit_on_hang(None),
    )
}

/// [`run`] with an injected clock and hang handler.
///
/// The tick loop and the watchdog monitor read the same clock. `on_hang`
/// runs on the monitor thread if a watchdog expiry is still unhandled one
/// full window later.
pub fn run_supervised<S, A, D, C>(
    sensor: S,
    actuator: A,
    sink: D,
    cfg: &RunCfg,
    shutdown: Arc<AtomicBool>,
    clock: C,
    on_hang: OnHang,
) -> CoreResult<RunSummary>
where
    S: TemperatureSensor + Send + 'static,
    A: Actuator,
    D: DiagnosticSink,
    C: Clock + Clone + Send + Sync + 'static,
{
    let period = Duration::from_millis(cfg.tick_ms.max(1));
    let shared = SharedAverage::new();
    let mut adc = AdcWorker::spawn(sensor, TemperatureSampler::new(shared.clone()));
    let watchdog = SoftWatchdog::new(clock.clone(), cfg.watchdog_ms);
    let monitor = WatchdogMonitor::spawn_with_escalation(watchdog.clone(), on_hang);
    let mut sup = Supervisor::new(actuator, sink, watchdog, shared.clone());
    sup.begin();

    tracing::info!(
        tick_ms = cfg.tick_ms,
        tick_hz = tick_hz(cfg.tick_ms),
        watchdog_ms = cfg.watchdog_ms,
        watchdog_ticks = ticks_in(cfg.watchdog_ms, cfg.tick_ms),
        max_ticks = ?cfg.max_ticks,
        "fan control start"
    );

    let mut ticks: u64 = 0;
    let mut sensor_failures: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(ticks, "shutdown requested");
            break;
        }
        if cfg.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }

        // Idle until the next timer period
        clock.sleep(period);
        sup.wake();

        if let Some(stalled_ms) = monitor.take_bite() {
            tracing::warn!(
                stalled_ms,
                state = %sup.state(),
                "watchdog reset, reinitializing"
            );
            sensor_failures += adc.failures();
            let sensor = adc.stop().ok_or_else(|| {
                crate::error::Report::new(FanError::State("adc context lost".into()))
            })?;
            sup.reset();
            adc = AdcWorker::spawn(sensor, TemperatureSampler::new(shared.clone()));
        }

        let report = match sup.tick() {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "actuator failure, stopping control");
                if let Err(fe) = sup.fail_safe() {
                    tracing::error!(error = %fe, "fail-safe drive failed");
                }
                return Err(crate::error::Report::new(e));
            }
        };
        // Next conversion is paced by the tick
        adc.arm();
        ticks += 1;
        log_tick(&report);
    }

    sensor_failures += adc.failures();
    drop(monitor);
    let summary = RunSummary {
        ticks,
        resets: sup.resets(),
        sensor_failures,
        final_state: sup.state(),
        final_average: sup.average(),
        final_duty: sup.duty(),
    };
    sup.fail_safe()?;
    tracing::info!(
        ticks = summary.ticks,
        resets = summary.resets,
        final_state = %summary.final_state,
        "fan control stopped"
    );
    Ok(summary)
}

fn log_tick(r: &TickReport) {
    tracing::trace!(
        tick = r.tick,
        average = r.average,
        state = %r.transition.state,
        duty = r.transition.duty,
        "tick"
    );
}

/// Deterministic, single-threaded rendition of the whole system.
///
/// Time only moves through [`Simulation::step`] and [`Simulation::stall`],
/// and a conversion completes within the tick that armed it, so the same
/// input trace always yields the same output trace.
pub struct Simulation<A: Actuator, D: DiagnosticSink> {
    supervisor: Supervisor<A, D, SoftWatchdog<ManualClock>>,
    sampler: TemperatureSampler,
    watchdog: SoftWatchdog<ManualClock>,
    clock: ManualClock,
    tick: Duration,
}

impl<A: Actuator, D: DiagnosticSink> Simulation<A, D> {
    pub fn new(actuator: A, sink: D, cfg: &RunCfg) -> Self {
        let clock = ManualClock::new();
        let shared = SharedAverage::new();
        let watchdog = SoftWatchdog::new(clock.clone(), cfg.watchdog_ms);
        let mut supervisor = Supervisor::new(actuator, sink, watchdog.clone(), shared.clone());
        supervisor.begin();
        Self {
            supervisor,
            sampler: TemperatureSampler::new(shared),
            watchdog,
            clock,
            tick: Duration::from_millis(cfg.tick_ms.max(1)),
        }
    }

    /// Advance one tick. `raw` is the conversion armed by this tick, if the
    /// sensor produced one.
    pub fn step(&mut self, raw: Option<u16>) -> Result<TickReport, FanError> {
        self.clock.advance(self.tick);
        if self.watchdog.expired() {
            tracing::warn!(
                stalled_ms = self.watchdog.stalled_for(),
                "watchdog reset, reinitializing"
            );
            self.reset();
        }
        self.supervisor.wake();
        let report = self.supervisor.tick()?;
        if let Some(raw) = raw {
            self.sampler.on_conversion_complete(raw);
        }
        Ok(report)
    }

    /// Let time pass without waking the main loop.
    pub fn stall(&mut self, d: Duration) {
        self.clock.advance(d);
    }

    /// Feed a conversion outside the tick cadence.
    pub fn convert(&mut self, raw: u16) -> u16 {
        self.sampler.on_conversion_complete(raw)
    }

    fn reset(&mut self) {
        self.sampler.reset();
        self.supervisor.reset();
    }

    pub fn supervisor(&self) -> &Supervisor<A, D, SoftWatchdog<ManualClock>> {
        &self.supervisor
    }

    pub fn sampler(&self) -> &TemperatureSampler {
        &self.sampler
    }

    pub fn resets(&self) -> u32 {
        self.supervisor.resets()
    }

    pub fn into_parts(self) -> (A, D) {
        let (a, d, _) = self.supervisor.into_parts();
        (a, d)
    }
}
