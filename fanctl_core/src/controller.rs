//! Fan state machine and duty-cycle mapping.
//!
//! The decision logic is the pure function [`transition`]; [`FanController`]
//! only keeps the current state and forwards the resulting [`Command`] to an
//! [`Actuator`]. Thresholds live on the calibrated raw scale (≈1 unit/°C,
//! 300 ≈ 25 °C, 330 ≈ 55 °C) and are fixed at build time.

use crate::error::FanError;
use crate::hw_error::map_hw_error;
use fanctl_traits::{Actuator, HwResult};

/// At or below this average the fan stops.
pub const STOP_AT: u16 = 300;
/// Above this average the fan runs at full duty.
pub const FULL_ABOVE: u16 = 330;
/// An idle fan restarts once the average climbs above this (hysteresis over `STOP_AT`).
pub const RESTART_ABOVE: u16 = 302;
/// FullSpeed hands over to PWM once the dwell counter exceeds this many ticks.
pub const KICK_TICKS: u16 = 32;
/// Lowest duty, in percent, commanded while actively cooling.
pub const MIN_DUTY_PCT: u16 = 40;
pub const DUTY_MAX: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FanState {
    /// Boot / post-reset state; leaves after one tick.
    #[default]
    Startup,
    /// Forced-on spin-up kick.
    FullSpeed,
    /// PWM engaged, duty follows temperature.
    Running,
    /// Fan stopped, watching for the restart threshold.
    Off,
}

impl FanState {
    pub fn name(self) -> &'static str {
        match self {
            FanState::Startup => "startup",
            FanState::FullSpeed => "full_speed",
            FanState::Running => "running",
            FanState::Off => "off",
        }
    }
}

impl std::fmt::Display for FanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the actuator has to do for one evaluated tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Disconnect PWM and drive the output fully on.
    Kick,
    /// Keep the current output.
    Hold,
    /// Load duty 255 and connect PWM compare.
    EngagePwm,
    /// Update the PWM compare value.
    SetDuty(u8),
}

impl Command {
    /// Replay this command on an actuator.
    pub fn apply<A: Actuator + ?Sized>(self, actuator: &mut A) -> HwResult<()> {
        match self {
            Command::Kick => {
                actuator.disable_pwm()?;
                actuator.force_on()
            }
            Command::Hold => Ok(()),
            Command::EngagePwm => {
                actuator.set_duty(DUTY_MAX)?;
                actuator.enable_pwm()
            }
            Command::SetDuty(duty) => actuator.set_duty(duty),
        }
    }
}

/// Result of one evaluation of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: FanState,
    /// Effective fan drive after this tick, 0..=255 (forced-on counts as 255).
    pub duty: u8,
    pub dwell: u16,
    pub command: Command,
}

/// Duty while Running for an average inside the proportional band.
///
/// Linear from 40 % at `STOP_AT` to 100 % at `FULL_ABOVE`, scaled to 8 bits
/// with truncating integer division. Outside the band it saturates: 0 at or
/// below `STOP_AT`, 255 above `FULL_ABOVE`.
pub const fn running_duty(average: u16) -> u8 {
    if average <= STOP_AT {
        return 0;
    }
    if average > FULL_ABOVE {
        return DUTY_MAX;
    }
    let pct = (average - STOP_AT) as u32 * 2 + MIN_DUTY_PCT as u32;
    let duty = pct * DUTY_MAX as u32 / 100;
    if duty > DUTY_MAX as u32 {
        DUTY_MAX
    } else {
        duty as u8
    }
}

/// Evaluate one tick: `(state, dwell, average) -> (state', duty', dwell')`.
pub const fn transition(state: FanState, dwell: u16, average: u16) -> Transition {
    match state {
        FanState::Startup => Transition {
            state: FanState::FullSpeed,
            duty: DUTY_MAX,
            dwell: 0,
            command: Command::Kick,
        },
        FanState::FullSpeed => {
            let dwell = dwell.wrapping_add(1);
            if dwell > KICK_TICKS {
                Transition {
                    state: FanState::Running,
                    duty: DUTY_MAX,
                    dwell,
                    command: Command::EngagePwm,
                }
            } else {
                Transition {
                    state: FanState::FullSpeed,
                    duty: DUTY_MAX,
                    dwell,
                    command: Command::Hold,
                }
            }
        }
        FanState::Running => {
            if average <= STOP_AT {
                Transition {
                    state: FanState::Off,
                    duty: 0,
                    dwell,
                    command: Command::SetDuty(0),
                }
            } else {
                let duty = running_duty(average);
                Transition {
                    state: FanState::Running,
                    duty,
                    dwell,
                    command: Command::SetDuty(duty),
                }
            }
        }
        FanState::Off => Transition {
            state: if average > RESTART_ABOVE {
                FanState::Startup
            } else {
                FanState::Off
            },
            duty: 0,
            dwell,
            command: Command::SetDuty(0),
        },
    }
}

/// Owner of the process-wide fan state.
#[derive(Debug, Clone, Default)]
pub struct FanController {
    state: FanState,
    dwell: u16,
    duty: u8,
}

impl FanController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FanState {
        self.state
    }

    pub fn dwell(&self) -> u16 {
        self.dwell
    }

    /// Drive currently applied to the fan (255 while forced on).
    pub fn duty(&self) -> u8 {
        self.duty
    }

    /// Evaluate one tick and push the resulting command to the actuator.
    ///
    /// State advances even if the actuator reports an error, so the next
    /// tick re-issues from a well-defined state.
    pub fn step<A: Actuator + ?Sized>(
        &mut self,
        average: u16,
        actuator: &mut A,
    ) -> Result<Transition, FanError> {
        let t = transition(self.state, self.dwell, average);
        if t.state != self.state {
            tracing::debug!(from = %self.state, to = %t.state, average, dwell = t.dwell, "fan state change");
        }
        self.state = t.state;
        self.dwell = t.dwell;
        self.duty = t.duty;
        t.command
            .apply(actuator)
            .map_err(|e| map_hw_error(&*e))?;
        Ok(t)
    }

    /// Back to `Startup`; the fan gets a full kick on the next tick.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
