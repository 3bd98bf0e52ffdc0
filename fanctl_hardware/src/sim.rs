//! A small thermal plant for running the controller without hardware.
//!
//! `ThermalPlant` holds the simulated temperature and the fan output. A
//! `SimulatedSensor` advances the plant by one step per conversion and
//! reports the raw reading; a `SimulatedFan` drives the cooling term. Both
//! handles share one plant, so closing the loop in software behaves like the
//! real thing: heat in, fan out.

use crate::{RAW_AT_ZERO_C, RAW_MAX};
use fanctl_traits::{Actuator, HwResult, TemperatureSensor};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Physical constants of the simulated enclosure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    /// Temperature at power-on.
    pub start_c: f32,
    /// Temperature the enclosure relaxes toward with the fan stopped.
    pub ambient_c: f32,
    /// Heating from the load, degrees per second.
    pub heat_c_per_s: f32,
    /// Cooling at full fan drive, degrees per second.
    pub cool_c_per_s: f32,
    /// Fraction of the excess over ambient lost per second without a fan.
    pub leak_per_s: f32,
    /// Peak reading noise in raw units.
    pub noise: u16,
    pub seed: u32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            start_c: 22.0,
            ambient_c: 22.0,
            heat_c_per_s: 0.5,
            cool_c_per_s: 1.5,
            leak_per_s: 0.002,
            noise: 1,
            seed: 0x2545_f491,
        }
    }
}

#[derive(Debug)]
struct PlantState {
    params: PlantParams,
    temp_c: f32,
    duty: u8,
    forced_on: bool,
    pwm: bool,
    rng: u32,
}

impl PlantState {
    fn drive(&self) -> f32 {
        if self.pwm {
            f32::from(self.duty) / 255.0
        } else if self.forced_on {
            1.0
        } else {
            0.0
        }
    }

    fn step(&mut self, dt: Duration) {
        let s = dt.as_secs_f32();
        let p = &self.params;
        let excess = self.temp_c - p.ambient_c;
        self.temp_c += (p.heat_c_per_s - p.cool_c_per_s * self.drive() - p.leak_per_s * excess) * s;
        // The fan cannot cool below ambient
        if self.temp_c < p.ambient_c && self.drive() > 0.0 {
            self.temp_c = p.ambient_c;
        }
    }

    // xorshift32, deterministic per seed
    fn next_noise(&mut self) -> i32 {
        let n = i32::from(self.params.noise);
        if n == 0 {
            return 0;
        }
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x % (2 * n as u32 + 1)) as i32 - n
    }

    fn sample(&mut self) -> u16 {
        let raw = self.temp_c.round() as i32 + RAW_AT_ZERO_C + self.next_noise();
        raw.clamp(0, i32::from(RAW_MAX)) as u16
    }
}

/// Shared simulated enclosure.
#[derive(Debug, Clone)]
pub struct ThermalPlant(Arc<Mutex<PlantState>>);

impl ThermalPlant {
    pub fn new(params: PlantParams) -> Self {
        Self(Arc::new(Mutex::new(PlantState {
            params,
            temp_c: params.start_c,
            duty: 0,
            forced_on: false,
            pwm: false,
            rng: params.seed.max(1),
        })))
    }

    fn lock(&self) -> MutexGuard<'_, PlantState> {
        // Plant state stays consistent even if a holder panicked
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn temperature_c(&self) -> f32 {
        self.lock().temp_c
    }

    pub fn set_temperature_c(&self, c: f32) {
        self.lock().temp_c = c;
    }

    /// Effective fan drive, 0.0..=1.0.
    pub fn drive(&self) -> f32 {
        self.lock().drive()
    }

    pub fn step(&self, dt: Duration) {
        self.lock().step(dt);
    }

    /// Sensor handle advancing the plant by `dt` per conversion.
    pub fn sensor(&self, dt: Duration) -> SimulatedSensor {
        SimulatedSensor {
            plant: self.clone(),
            dt,
        }
    }

    pub fn fan(&self) -> SimulatedFan {
        SimulatedFan {
            plant: self.clone(),
        }
    }
}

impl Default for ThermalPlant {
    fn default() -> Self {
        Self::new(PlantParams::default())
    }
}

pub struct SimulatedSensor {
    plant: ThermalPlant,
    dt: Duration,
}

impl TemperatureSensor for SimulatedSensor {
    fn read(&mut self) -> HwResult<u16> {
        let mut st = self.plant.lock();
        st.step(self.dt);
        let raw = st.sample();
        tracing::trace!(raw, temp_c = st.temp_c, "simulated conversion");
        Ok(raw)
    }
}

/// Fan output modelled the way the timer drives it: compare value when PWM
/// is engaged, plain pin level otherwise.
pub struct SimulatedFan {
    plant: ThermalPlant,
}

impl Actuator for SimulatedFan {
    fn set_duty(&mut self, duty: u8) -> HwResult<()> {
        self.plant.lock().duty = duty;
        Ok(())
    }

    fn force_on(&mut self) -> HwResult<()> {
        self.plant.lock().forced_on = true;
        Ok(())
    }

    fn force_off(&mut self) -> HwResult<()> {
        self.plant.lock().forced_on = false;
        Ok(())
    }

    fn enable_pwm(&mut self) -> HwResult<()> {
        self.plant.lock().pwm = true;
        Ok(())
    }

    fn disable_pwm(&mut self) -> HwResult<()> {
        self.plant.lock().pwm = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(start_c: f32) -> PlantParams {
        PlantParams {
            start_c,
            noise: 0,
            ..PlantParams::default()
        }
    }

    #[test]
    fn reading_tracks_temperature() {
        let plant = ThermalPlant::new(PlantParams {
            heat_c_per_s: 0.0,
            ..quiet(25.0)
        });
        let mut s = plant.sensor(Duration::ZERO);
        assert_eq!(s.read().unwrap(), 303);
    }

    #[test]
    fn heats_with_fan_stopped() {
        let plant = ThermalPlant::new(quiet(30.0));
        plant.step(Duration::from_secs(10));
        assert!(plant.temperature_c() > 30.0);
    }

    #[test]
    fn forced_fan_cools() {
        let plant = ThermalPlant::new(quiet(40.0));
        let mut fan = plant.fan();
        fan.force_on().unwrap();
        assert_eq!(plant.drive(), 1.0);
        plant.step(Duration::from_secs(5));
        assert!(plant.temperature_c() < 40.0);
    }

    #[test]
    fn pwm_overrides_forced_level() {
        let plant = ThermalPlant::default();
        let mut fan = plant.fan();
        fan.force_on().unwrap();
        fan.set_duty(0).unwrap();
        fan.enable_pwm().unwrap();
        assert_eq!(plant.drive(), 0.0);
        fan.disable_pwm().unwrap();
        assert_eq!(plant.drive(), 1.0);
    }

    #[test]
    fn noise_is_bounded_and_deterministic() {
        let params = PlantParams {
            heat_c_per_s: 0.0,
            noise: 2,
            ..quiet(25.0)
        };
        let a: Vec<u16> = {
            let mut s = ThermalPlant::new(params).sensor(Duration::ZERO);
            (0..50).map(|_| s.read().unwrap()).collect()
        };
        let b: Vec<u16> = {
            let mut s = ThermalPlant::new(params).sensor(Duration::ZERO);
            (0..50).map(|_| s.read().unwrap()).collect()
        };
        assert_eq!(a, b);
        assert!(a.iter().all(|&r| (301..=305).contains(&r)));
    }
}
