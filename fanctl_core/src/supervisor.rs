//! Tick-level orchestration: control first, then diagnostics.
//!
//! One `Supervisor` owns the fan controller together with the actuator,
//! the diagnostic sink and the watchdog handle. The main loop calls
//! [`Supervisor::wake`] every time it leaves idle and [`Supervisor::tick`]
//! once per timer period.

use crate::controller::{Command, FanController, FanState, Transition};
use crate::error::FanError;
use crate::hw_error::map_hw_error;
use crate::sampler::SharedAverage;
use fanctl_traits::{Actuator, DiagnosticSink, Watchdog};
use std::fmt::Write as _;

/// A diagnostic report goes out once every this many ticks.
pub const REPORT_EVERY: u8 = 32;

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Free-running tick counter after this tick (wraps).
    pub tick: u32,
    /// Average the controller saw.
    pub average: u16,
    pub transition: Transition,
    /// Whether a diagnostic line was emitted on this tick.
    pub reported: bool,
}

/// `fmt::Write` adapter so numbers render straight into the sink.
struct SinkWriter<'a, D: DiagnosticSink + ?Sized>(&'a mut D);

impl<D: DiagnosticSink + ?Sized> std::fmt::Write for SinkWriter<'_, D> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

pub struct Supervisor<A: Actuator, D: DiagnosticSink, W: Watchdog> {
    controller: FanController,
    actuator: A,
    sink: D,
    watchdog: W,
    average: SharedAverage,
    ticks: u32,
    report_count: u8,
    resets: u32,
}

impl<A: Actuator, D: DiagnosticSink, W: Watchdog> Supervisor<A, D, W> {
    pub fn new(actuator: A, sink: D, watchdog: W, average: SharedAverage) -> Self {
        Self {
            controller: FanController::new(),
            actuator,
            sink,
            watchdog,
            average,
            ticks: 0,
            report_count: 0,
            resets: 0,
        }
    }

    /// Bring the diagnostic line into a known state.
    pub fn begin(&mut self) {
        self.sink.clear();
        self.sink.clear();
        tracing::debug!(state = %self.controller.state(), "supervisor started");
    }

    /// Called every time the main loop leaves idle.
    #[inline]
    pub fn wake(&mut self) {
        self.watchdog.refresh();
    }

    /// One timer period: evaluate the state machine, then the report cadence.
    pub fn tick(&mut self) -> Result<TickReport, FanError> {
        self.ticks = self.ticks.wrapping_add(1);
        let average = self.average.load();
        let transition = self.controller.step(average, &mut self.actuator)?;

        self.report_count = self.report_count.wrapping_add(1);
        let reported = self.report_count >= REPORT_EVERY;
        if reported {
            self.report_count = 0;
            self.report(average);
        }

        Ok(TickReport {
            tick: self.ticks,
            average,
            transition,
            reported,
        })
    }

    fn report(&mut self, average: u16) {
        self.sink.clear();
        write!(SinkWriter(&mut self.sink), "ADC:{average}").ok();
        tracing::debug!(average, "diagnostic report");
    }

    /// Reinitialize everything a hardware reset would: controller back to
    /// `Startup`, counters cleared, published average back to unseeded.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.ticks = 0;
        self.report_count = 0;
        self.average.reset();
        self.resets = self.resets.saturating_add(1);
        self.begin();
    }

    /// Drive the fan fully on outside PWM control; used when control stops.
    pub fn fail_safe(&mut self) -> Result<(), FanError> {
        Command::Kick
            .apply(&mut self.actuator)
            .map_err(|e| map_hw_error(&*e))
    }

    pub fn state(&self) -> FanState {
        self.controller.state()
    }

    pub fn duty(&self) -> u8 {
        self.controller.duty()
    }

    pub fn dwell(&self) -> u16 {
        self.controller.dwell()
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn average(&self) -> u16 {
        self.average.load()
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    pub fn into_parts(self) -> (A, D, W) {
        (self.actuator, self.sink, self.watchdog)
    }
}
