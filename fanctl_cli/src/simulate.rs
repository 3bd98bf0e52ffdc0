//! Offline replay and the self-check, both on the deterministic simulation.

use crate::hw;
use eyre::Result;
use fanctl_config::{Config, Profile, SensorBackend};
use fanctl_core::controller::{FanState, KICK_TICKS};
use fanctl_core::{FanError, RunCfg, Simulation, TickReport};
use fanctl_hardware::{SimulatedFan, ThermalPlant, TracingSink};
use fanctl_traits::TemperatureSensor as _;
use std::path::Path;
use std::time::Duration;

/// Ticks simulated past the last profile row when no count is given.
const TAIL_TICKS: u64 = 100;

#[derive(Debug, Default)]
struct Tally {
    startup: u64,
    full_speed: u64,
    running: u64,
    off: u64,
    transitions: u64,
    reports: u64,
}

impl Tally {
    fn count(&mut self, r: &TickReport, prev: FanState) {
        match r.transition.state {
            FanState::Startup => self.startup += 1,
            FanState::FullSpeed => self.full_speed += 1,
            FanState::Running => self.running += 1,
            FanState::Off => self.off += 1,
        }
        if r.transition.state != prev {
            self.transitions += 1;
        }
        if r.reported {
            self.reports += 1;
        }
    }
}

pub fn simulate_cmd(cfg: &Config, profile: &Path, ticks: Option<u64>, json: bool) -> Result<()> {
    let profile = fanctl_config::load_profile_csv(profile)?;
    let total = ticks.unwrap_or_else(|| profile.last_tick().saturating_add(TAIL_TICKS));
    let rc: RunCfg = cfg.into();
    tracing::info!(ticks = total, rows = profile.rows().len(), "simulation start");

    let (tally, final_state, final_duty) = replay(cfg, &profile, total, &rc, |r, raw| {
        if json {
            let line = serde_json::json!({
                "tick": r.tick,
                "raw": raw,
                "average": r.average,
                "state": r.transition.state.name(),
                "duty": r.transition.duty,
                "reported": r.reported,
            });
            println!("{line}");
        }
    })?;

    if json {
        return Ok(());
    }
    println!("simulated {total} ticks, {} state changes, {} reports", tally.transitions, tally.reports);
    println!(
        "ticks per state: startup={} full_speed={} running={} off={}",
        tally.startup, tally.full_speed, tally.running, tally.off
    );
    println!("final: state={final_state} duty={final_duty}");
    Ok(())
}

/// Simulation whose fan drives the enclosure described by `[sensor]`.
fn simulation_for(cfg: &Config, rc: &RunCfg) -> (ThermalPlant, Simulation<SimulatedFan, TracingSink>) {
    let plant = hw::plant_for(cfg);
    let sim = Simulation::new(plant.fan(), TracingSink::new(), rc);
    (plant, sim)
}

fn replay(
    cfg: &Config,
    profile: &Profile,
    total: u64,
    rc: &RunCfg,
    mut emit: impl FnMut(&TickReport, Option<u16>),
) -> Result<(Tally, FanState, u8)> {
    let (_plant, mut sim) = simulation_for(cfg, rc);
    let mut tally = Tally::default();
    let mut prev = sim.supervisor().state();
    for tick in 0..total {
        let raw = profile.raw_at(tick);
        let r = sim.step(raw)?;
        if r.transition.state != prev {
            tracing::debug!(tick = r.tick, from = %prev, to = %r.transition.state, average = r.average, "state change");
        }
        tally.count(&r, prev);
        prev = r.transition.state;
        emit(&r, raw);
    }
    Ok((tally, sim.supervisor().state(), sim.supervisor().duty()))
}

fn check(cond: bool, what: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(eyre::eyre!("self-check failed: {what}"))
    }
}

/// Runs the startup sequence against a simulated fan and reads the
/// configured sensor once.
pub fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let rc: RunCfg = cfg.into();
    let (plant, mut sim) = simulation_for(cfg, &rc);

    // Hot enclosure: 340 calibrated
    let hot = Some(343);
    let r = sim.step(hot)?;
    check(r.transition.state == FanState::FullSpeed, "first tick must start the kick")?;
    check(plant.drive() >= 1.0, "fan not forced on during the kick")?;
    for _ in 0..KICK_TICKS {
        sim.step(hot)?;
    }
    let r = sim.step(hot)?;
    check(r.transition.state == FanState::Running, "no handoff to PWM after the kick")?;
    let r = sim.step(hot)?;
    check(r.transition.duty == u8::MAX, "hot enclosure must run at full duty")?;

    // Cool down to the stop threshold
    for _ in 0..40 {
        sim.step(Some(303))?;
    }
    check(sim.supervisor().state() == FanState::Off, "fan did not stop at 300")?;
    check(plant.drive() == 0.0, "fan output not off")?;

    // A missed refresh must reinitialize
    sim.stall(Duration::from_millis(rc.watchdog_ms.saturating_add(rc.tick_ms)));
    sim.step(None)?;
    check(sim.resets() == 1, "watchdog stall did not reset")?;

    let sensor = match cfg.sensor.backend {
        SensorBackend::Sim => None,
        SensorBackend::Sysfs => {
            let mut s = hw::open_sensor(cfg, &plant, rc.tick_ms)?;
            let raw = s.read().map_err(|e| FanError::Sensor(e.to_string()))?;
            Some(raw)
        }
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "self_check": "ok", "sensor_raw": sensor })
        );
    } else {
        match sensor {
            Some(raw) => println!("self-check ok (sensor raw {raw})"),
            None => println!("self-check ok"),
        }
    }
    Ok(())
}
