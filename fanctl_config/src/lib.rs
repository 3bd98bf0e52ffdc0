#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and temperature-profile parsing for the fan controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section has defaults, so an empty file is a valid config.
//! - The profile CSV loader enforces headers and ordering for offline
//!   simulation runs.
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound of the 10-bit converter.
pub const RAW_MAX: u16 = 1023;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// Scheduler tick period (ms).
    pub tick_ms: u64,
    /// Watchdog window (ms). Must outlast several ticks.
    pub watchdog_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: 33,
            watchdog_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorBackend {
    #[default]
    Sim,
    Sysfs,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Sensor {
    pub backend: SensorBackend,
    /// Thermal zone file for the sysfs backend (millidegrees Celsius).
    pub zone: PathBuf,
    /// Simulated enclosure temperature at start.
    pub sim_start_c: f32,
    /// Simulated heating from the load in degrees per second.
    pub sim_ramp_c_per_s: f32,
    /// Peak simulated reading noise in raw units.
    pub sim_noise: u16,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            backend: SensorBackend::Sim,
            zone: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
            sim_start_c: 22.0,
            sim_ramp_c_per_s: 0.5,
            sim_noise: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FanBackend {
    #[default]
    Sim,
    Rpi,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Fan {
    pub backend: FanBackend,
    /// Hardware PWM channel (0 or 1) for the rpi backend.
    pub pwm_channel: u8,
    pub pwm_frequency_hz: f64,
}

impl Default for Fan {
    fn default() -> Self {
        Self {
            backend: FanBackend::Sim,
            pwm_channel: 0,
            pwm_frequency_hz: 25_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub timing: Timing,
    pub sensor: Sensor,
    pub fan: Fan,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Timing
        if self.timing.tick_ms == 0 {
            eyre::bail!("timing.tick_ms must be >= 1");
        }
        if self.timing.tick_ms > 10_000 {
            eyre::bail!("timing.tick_ms is unreasonably large (>10s)");
        }
        if self.timing.watchdog_ms <= self.timing.tick_ms {
            eyre::bail!("timing.watchdog_ms must be greater than timing.tick_ms");
        }
        if self.timing.watchdog_ms > 60_000 {
            eyre::bail!("timing.watchdog_ms is unreasonably large (>60s)");
        }

        // Sensor
        if self.sensor.backend == SensorBackend::Sysfs && self.sensor.zone.as_os_str().is_empty() {
            eyre::bail!("sensor.zone must be set for the sysfs backend");
        }
        if !self.sensor.sim_start_c.is_finite() || !(-40.0..=150.0).contains(&self.sensor.sim_start_c)
        {
            eyre::bail!("sensor.sim_start_c must be in [-40, 150]");
        }
        if !self.sensor.sim_ramp_c_per_s.is_finite() || self.sensor.sim_ramp_c_per_s.abs() > 50.0 {
            eyre::bail!("sensor.sim_ramp_c_per_s must be in [-50, 50]");
        }
        if self.sensor.sim_noise > 50 {
            eyre::bail!("sensor.sim_noise must be <= 50");
        }

        // Fan
        if self.fan.pwm_channel > 1 {
            eyre::bail!("fan.pwm_channel must be 0 or 1");
        }
        if !(self.fan.pwm_frequency_hz > 0.0 && self.fan.pwm_frequency_hz <= 100_000.0) {
            eyre::bail!("fan.pwm_frequency_hz must be in (0, 100000]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

/// Temperature profile CSV schema.
///
/// Expected headers:
/// tick,raw
///
/// Example:
/// tick,raw
/// 0,290
/// 100,318
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRow {
    pub tick: u64,
    pub raw: u16,
}

/// Step-wise raw reading over time: each row holds until the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    rows: Vec<ProfileRow>,
}

impl Profile {
    /// Rows must be non-empty, strictly increasing in `tick`, and in range.
    pub fn from_rows(rows: Vec<ProfileRow>) -> eyre::Result<Self> {
        if rows.is_empty() {
            eyre::bail!("profile requires at least one row");
        }
        for (i, w) in rows.windows(2).enumerate() {
            if w[1].tick <= w[0].tick {
                eyre::bail!(
                    "profile ticks must be strictly increasing (rows {} and {})",
                    i + 2,
                    i + 3
                );
            }
        }
        if let Some(bad) = rows.iter().find(|r| r.raw > RAW_MAX) {
            eyre::bail!("profile raw value {} at tick {} exceeds {RAW_MAX}", bad.raw, bad.tick);
        }
        Ok(Self { rows })
    }

    /// Reading in effect at `tick`, or `None` before the first row.
    pub fn raw_at(&self, tick: u64) -> Option<u16> {
        let idx = self.rows.partition_point(|r| r.tick <= tick);
        idx.checked_sub(1).map(|i| self.rows[i].raw)
    }

    /// Tick of the last row.
    pub fn last_tick(&self) -> u64 {
        self.rows.last().map_or(0, |r| r.tick)
    }

    pub fn rows(&self) -> &[ProfileRow] {
        &self.rows
    }
}

impl TryFrom<Vec<ProfileRow>> for Profile {
    type Error = eyre::Report;
    fn try_from(rows: Vec<ProfileRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_profile_csv(path: &Path) -> eyre::Result<Profile> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open profile CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["tick", "raw"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "profile CSV must have headers 'tick,raw', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProfileRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Profile::try_from(rows)
}
