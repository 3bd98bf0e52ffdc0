//! Hardware backends for the fan controller.
//!
//! Everything here implements the capability traits from `fanctl_traits`.
//! The simulated plant and the sinks build everywhere; the Raspberry Pi PWM
//! fan needs the `hardware` feature on Linux.

pub mod error;
pub mod sim;
pub mod sink;
pub mod sysfs;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;

pub use sim::{PlantParams, SimulatedFan, SimulatedSensor, ThermalPlant};
pub use sink::{TerminalSink, TracingSink};
pub use sysfs::SysfsThermalSensor;

/// Raw converter units corresponding to 0 °C.
///
/// The controller subtracts 3 from every reading, so a raw value of
/// `°C + 278` calibrates to `°C + 275` and 25 °C lands on 300.
pub const RAW_AT_ZERO_C: i32 = 278;

/// Full scale of the 10-bit converter.
pub const RAW_MAX: u16 = 1023;

/// Map a temperature in millidegrees Celsius onto the raw converter scale,
/// rounding to the nearest degree and clamping to 0..=1023.
pub fn millicelsius_to_raw(milli: i64) -> u16 {
    let deg = (milli + 500).div_euclid(1000);
    (deg + i64::from(RAW_AT_ZERO_C)).clamp(0, i64::from(RAW_MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(25_000, 303)]
    #[case(24_600, 303)]
    #[case(24_400, 302)]
    #[case(0, 278)]
    #[case(-300_000, 0)]
    #[case(900_000, 1023)]
    fn millicelsius_maps_onto_raw_scale(#[case] milli: i64, #[case] raw: u16) {
        assert_eq!(millicelsius_to_raw(milli), raw);
    }
}
