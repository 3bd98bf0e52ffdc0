//! Raspberry Pi hardware PWM fan.
//!
//! The PWM peripheral stays enabled; "PWM disengaged" is modelled by pinning
//! the duty cycle at 0 % or 100 % according to the forced level, which is
//! what a disconnected timer compare output does.

use crate::error::{HwError, Result};
use fanctl_traits::{Actuator, HwResult};
use rppal::pwm::{Channel, Polarity, Pwm};

pub struct RpiPwmFan {
    pwm: Pwm,
    duty: u8,
    forced_on: bool,
    engaged: bool,
}

impl RpiPwmFan {
    /// `channel` is 0 or 1 (GPIO18/GPIO19 with the default overlay).
    pub fn new(channel: u8, frequency_hz: f64) -> Result<Self> {
        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("no such PWM channel {other}"))),
        };
        let pwm = Pwm::with_frequency(channel, frequency_hz, 0.0, Polarity::Normal, true)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        tracing::info!(?channel, frequency_hz, "pwm fan ready");
        Ok(Self {
            pwm,
            duty: 0,
            forced_on: false,
            engaged: false,
        })
    }

    fn apply(&mut self) -> HwResult<()> {
        let cycle = if self.engaged {
            f64::from(self.duty) / 255.0
        } else if self.forced_on {
            1.0
        } else {
            0.0
        };
        self.pwm
            .set_duty_cycle(cycle)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(())
    }
}

impl Actuator for RpiPwmFan {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        self.duty = duty;
        if self.engaged {
            self.apply()?;
        }
        Ok(())
    }

    fn force_on(&mut self) -> HwResult<()> {
        self.forced_on = true;
        self.apply()
    }

    fn force_off(&mut self) -> HwResult<()> {
        self.forced_on = false;
        self.apply()
    }

    fn enable_pwm(&mut self) -> HwResult<()> {
        self.engaged = true;
        self.apply()
    }

    fn disable_pwm(&mut self) -> HwResult<()> {
        self.engaged = false;
        self.apply()
    }
}

impl Drop for RpiPwmFan {
    fn drop(&mut self) {
        // Leave the fan running if the process goes away
        if let Err(e) = self.pwm.set_duty_cycle(1.0) {
            tracing::warn!(error = %e, "could not force fan on at exit");
        }
    }
}
