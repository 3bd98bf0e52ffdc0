//! Hardware assembly from the config backends.

use eyre::Result;
use fanctl_config::{Config, FanBackend, SensorBackend};
use fanctl_core::FanError;
use fanctl_hardware::{PlantParams, SysfsThermalSensor, ThermalPlant};
use fanctl_traits::{Actuator, TemperatureSensor};
use std::time::Duration;

pub type BoxSensor = Box<dyn TemperatureSensor + Send>;
pub type BoxFan = Box<dyn Actuator>;
/// Second handle on the fan, driven from the watchdog thread on a hang.
pub type FailSafe = Box<dyn Actuator + Send>;

/// The simulated enclosure described by `[sensor]`.
pub fn plant_for(cfg: &Config) -> ThermalPlant {
    ThermalPlant::new(PlantParams {
        start_c: cfg.sensor.sim_start_c,
        ambient_c: cfg.sensor.sim_start_c,
        heat_c_per_s: cfg.sensor.sim_ramp_c_per_s,
        noise: cfg.sensor.sim_noise,
        ..PlantParams::default()
    })
}

pub fn open_sensor(cfg: &Config, plant: &ThermalPlant, tick_ms: u64) -> Result<BoxSensor> {
    Ok(match cfg.sensor.backend {
        SensorBackend::Sim => Box::new(plant.sensor(Duration::from_millis(tick_ms))),
        SensorBackend::Sysfs => {
            let s = SysfsThermalSensor::open(&cfg.sensor.zone)
                .map_err(|e| FanError::Sensor(format!("{}: {e}", cfg.sensor.zone.display())))?;
            Box::new(s)
        }
    })
}

pub fn open_fan(cfg: &Config, plant: &ThermalPlant) -> Result<BoxFan> {
    Ok(match cfg.fan.backend {
        FanBackend::Sim => Box::new(plant.fan()),
        FanBackend::Rpi => open_rpi(cfg)?,
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_rpi(cfg: &Config) -> Result<BoxFan> {
    let fan = fanctl_hardware::rpi::RpiPwmFan::new(cfg.fan.pwm_channel, cfg.fan.pwm_frequency_hz)
        .map_err(|e| FanError::Hardware(e.to_string()))?;
    Ok(Box::new(fan))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_rpi(_cfg: &Config) -> Result<BoxFan> {
    Err(FanError::Config(
        "fan backend 'rpi' requires a Linux build with --features hardware".into(),
    )
    .into())
}

/// Sensor and fan for a live run. Simulated parts share one plant.
///
/// The PWM peripheral has a single owner, so only the simulated fan comes
/// with a fail-safe handle; `RpiPwmFan` forces itself on when dropped.
pub fn assemble(cfg: &Config, tick_ms: u64) -> Result<(BoxSensor, BoxFan, Option<FailSafe>)> {
    let plant = plant_for(cfg);
    let sensor = open_sensor(cfg, &plant, tick_ms)?;
    let fan = open_fan(cfg, &plant)?;
    let failsafe: Option<FailSafe> = match cfg.fan.backend {
        FanBackend::Sim => Some(Box::new(plant.fan())),
        FanBackend::Rpi => None,
    };
    tracing::info!(
        sensor = ?cfg.sensor.backend,
        fan = ?cfg.fan.backend,
        failsafe = failsafe.is_some(),
        "hardware assembled"
    );
    Ok((sensor, fan, failsafe))
}
