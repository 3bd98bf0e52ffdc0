//! Test and helper mocks for fanctl_core.

use fanctl_traits::{Actuator, DiagnosticSink, HwResult, TemperatureSensor, Watchdog};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One call observed by [`RecordingActuator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorEvent {
    SetDuty(u8),
    ForceOn,
    ForceOff,
    EnablePwm,
    DisablePwm,
}

/// Actuator that records every call and models the resulting output level.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    events: Vec<ActuatorEvent>,
    duty: u8,
    forced_on: bool,
    pwm: bool,
    fail_with: Option<String>,
}

impl RecordingActuator {
    /// An actuator whose every call fails with `msg`.
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::default()
        }
    }

    pub fn events(&self) -> &[ActuatorEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Last loaded compare value.
    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn pwm_enabled(&self) -> bool {
        self.pwm
    }

    /// Output level: compare value when PWM is engaged, forced level otherwise.
    pub fn is_on(&self) -> bool {
        if self.pwm {
            self.duty > 0
        } else {
            self.forced_on
        }
    }

    fn record(&mut self, ev: ActuatorEvent) -> HwResult<()> {
        if let Some(msg) = &self.fail_with {
            return Err(Box::new(std::io::Error::other(msg.clone())));
        }
        self.events.push(ev);
        match ev {
            ActuatorEvent::SetDuty(d) => self.duty = d,
            ActuatorEvent::ForceOn => self.forced_on = true,
            ActuatorEvent::ForceOff => self.forced_on = false,
            ActuatorEvent::EnablePwm => self.pwm = true,
            ActuatorEvent::DisablePwm => self.pwm = false,
        }
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        self.record(ActuatorEvent::SetDuty(duty))
    }
    fn force_on(&mut self) -> HwResult<()> {
        self.record(ActuatorEvent::ForceOn)
    }
    fn force_off(&mut self) -> HwResult<()> {
        self.record(ActuatorEvent::ForceOff)
    }
    fn enable_pwm(&mut self) -> HwResult<()> {
        self.record(ActuatorEvent::EnablePwm)
    }
    fn disable_pwm(&mut self) -> HwResult<()> {
        self.record(ActuatorEvent::DisablePwm)
    }
}

/// Sink that keeps everything written since the last clear.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub clears: usize,
    pub line: String,
    pub lines: Vec<String>,
}

impl DiagnosticSink for MemorySink {
    fn clear(&mut self) {
        self.clears += 1;
        if !self.line.is_empty() {
            self.lines.push(std::mem::take(&mut self.line));
        }
    }
    fn home(&mut self) {}
    fn write_str(&mut self, s: &str) {
        self.line.push_str(s);
    }
}

impl MemorySink {
    /// Completed lines plus the one in progress.
    pub fn all_lines(&self) -> Vec<String> {
        let mut v = self.lines.clone();
        if !self.line.is_empty() {
            v.push(self.line.clone());
        }
        v
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn clear(&mut self) {}
    fn home(&mut self) {}
    fn write_str(&mut self, _s: &str) {}
}

/// Watchdog that just counts refreshes.
#[derive(Debug, Default, Clone)]
pub struct CountingWatchdog(Arc<AtomicU64>);

impl CountingWatchdog {
    pub fn refreshes(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Watchdog for CountingWatchdog {
    fn refresh(&mut self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sensor replaying a fixed list of raw readings, repeating the last one.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    readings: Vec<u16>,
    idx: usize,
}

impl ScriptedSensor {
    pub fn new(readings: Vec<u16>) -> Self {
        Self { readings, idx: 0 }
    }

    /// Always returns `raw`.
    pub fn constant(raw: u16) -> Self {
        Self::new(vec![raw])
    }
}

impl TemperatureSensor for ScriptedSensor {
    fn read(&mut self) -> HwResult<u16> {
        let Some(last) = self.readings.len().checked_sub(1) else {
            return Err(Box::new(std::io::Error::other("no readings scripted")));
        };
        let v = self.readings[self.idx.min(last)];
        self.idx = self.idx.saturating_add(1);
        Ok(v)
    }
}

/// A sensor that always errors on read.
pub struct FailingSensor;

impl TemperatureSensor for FailingSensor {
    fn read(&mut self) -> HwResult<u16> {
        Err(Box::new(std::io::Error::other("conversion timeout")))
    }
}
