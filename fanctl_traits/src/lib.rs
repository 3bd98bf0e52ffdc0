pub mod clock;

pub use clock::manual::ManualClock;
pub use clock::{Clock, MonotonicClock};

/// Boxed error used at every hardware trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Single-shot temperature conversion on a fixed channel (raw 0..=1023).
pub trait TemperatureSensor {
    fn read(&mut self) -> HwResult<u16>;
}

/// Fan driver output.
///
/// While PWM compare is disabled the output follows `force_on`/`force_off`;
/// once enabled it follows the 8-bit duty value (0 = off, 255 = fully on).
pub trait Actuator {
    fn set_duty(&mut self, duty: u8) -> HwResult<()>;
    fn force_on(&mut self) -> HwResult<()>;
    fn force_off(&mut self) -> HwResult<()>;
    fn enable_pwm(&mut self) -> HwResult<()>;
    fn disable_pwm(&mut self) -> HwResult<()>;
}

/// Hardware watchdog; must be refreshed within its window or the system resets.
pub trait Watchdog {
    fn refresh(&mut self);
}

/// Write-only diagnostic text output.
pub trait DiagnosticSink {
    fn clear(&mut self);
    fn home(&mut self);
    fn write_str(&mut self, s: &str);
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        (**self).set_duty(duty)
    }
    fn force_on(&mut self) -> HwResult<()> {
        (**self).force_on()
    }
    fn force_off(&mut self) -> HwResult<()> {
        (**self).force_off()
    }
    fn enable_pwm(&mut self) -> HwResult<()> {
        (**self).enable_pwm()
    }
    fn disable_pwm(&mut self) -> HwResult<()> {
        (**self).disable_pwm()
    }
}

impl<T: TemperatureSensor + ?Sized> TemperatureSensor for Box<T> {
    fn read(&mut self) -> HwResult<u16> {
        (**self).read()
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Box<T> {
    fn clear(&mut self) {
        (**self).clear();
    }
    fn home(&mut self) {
        (**self).home();
    }
    fn write_str(&mut self, s: &str) {
        (**self).write_str(s);
    }
}
