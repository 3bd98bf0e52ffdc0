//! Full tick sequences through the supervisor and the deterministic simulation.

use fanctl_core::controller::{Command, FanState, KICK_TICKS, running_duty};
use fanctl_core::mocks::{CountingWatchdog, MemorySink, RecordingActuator};
use fanctl_core::{RunCfg, SharedAverage, Simulation, Supervisor};
use std::time::Duration;

type Sup = Supervisor<RecordingActuator, MemorySink, CountingWatchdog>;

fn supervisor() -> (Sup, SharedAverage) {
    let shared = SharedAverage::new();
    let mut sup = Supervisor::new(
        RecordingActuator::default(),
        MemorySink::default(),
        CountingWatchdog::default(),
        shared.clone(),
    );
    sup.begin();
    (sup, shared)
}

fn tick_until(sup: &mut Sup, state: FanState, limit: usize) -> usize {
    for n in 1..=limit {
        if sup.tick().unwrap().transition.state == state {
            return n;
        }
    }
    panic!("never reached {state} within {limit} ticks");
}

#[test]
fn cold_boot_kicks_then_stops() {
    let (mut sup, shared) = supervisor();
    shared.store(250);
    let r = sup.tick().unwrap();
    assert_eq!(r.transition.state, FanState::FullSpeed);
    assert_eq!(r.transition.command, Command::Kick);
    let n = tick_until(&mut sup, FanState::Running, 100);
    assert_eq!(n, usize::from(KICK_TICKS) + 1);
    let r = sup.tick().unwrap();
    assert_eq!(r.transition.state, FanState::Off);
    assert_eq!(sup.actuator().duty(), 0);
}

#[test]
fn warming_from_off_reruns_full_kick() {
    let (mut sup, shared) = supervisor();
    shared.store(250);
    tick_until(&mut sup, FanState::Off, 100);

    // One averaging window lifts the reading from 250 to 305
    shared.store(305);
    let r = sup.tick().unwrap();
    assert_eq!(r.transition.state, FanState::Startup);
    let r = sup.tick().unwrap();
    assert_eq!(r.transition.state, FanState::FullSpeed);
    assert!(sup.actuator().is_on());
    assert!(!sup.actuator().pwm_enabled());

    for _ in 0..KICK_TICKS {
        assert_eq!(sup.tick().unwrap().transition.state, FanState::FullSpeed);
    }
    // Temperature keeps moving during the kick
    shared.store(315);
    let r = sup.tick().unwrap();
    assert_eq!(r.transition.state, FanState::Running);
    assert_eq!(r.transition.dwell, KICK_TICKS + 1);
    assert!(sup.actuator().pwm_enabled());

    let r = sup.tick().unwrap();
    assert_eq!(r.transition.duty, running_duty(315));
    assert_eq!(sup.actuator().duty(), 178);
}

#[test]
fn off_holds_at_hysteresis_edge() {
    let (mut sup, shared) = supervisor();
    shared.store(250);
    tick_until(&mut sup, FanState::Off, 100);
    shared.store(302);
    for _ in 0..100 {
        assert_eq!(sup.tick().unwrap().transition.state, FanState::Off);
    }
    shared.store(303);
    assert_eq!(sup.tick().unwrap().transition.state, FanState::Startup);
}

#[test]
fn running_tracks_temperature_and_saturates() {
    let (mut sup, shared) = supervisor();
    shared.store(331);
    tick_until(&mut sup, FanState::Running, 100);
    assert_eq!(sup.tick().unwrap().transition.duty, 255);
    shared.store(315);
    assert_eq!(sup.tick().unwrap().transition.duty, 178);
    shared.store(301);
    assert_eq!(sup.tick().unwrap().transition.duty, 107);
    shared.store(300);
    let r = sup.tick().unwrap();
    assert_eq!((r.transition.state, r.transition.duty), (FanState::Off, 0));
}

#[test]
fn simulation_samples_feed_the_controller() {
    let mut sim = Simulation::new(
        RecordingActuator::default(),
        MemorySink::default(),
        &RunCfg::default(),
    );
    // 343 raw -> 340 calibrated, fully hot
    for _ in 0..60 {
        sim.step(Some(343)).unwrap();
    }
    assert_eq!(sim.supervisor().state(), FanState::Running);
    assert_eq!(sim.supervisor().duty(), 255);
    let (act, sink) = sim.into_parts();
    assert_eq!(act.duty(), 255);
    assert!(sink.all_lines().iter().all(|l| l == "ADC:340"));
}

#[test]
fn missed_refresh_forces_cold_restart() {
    let mut sim = Simulation::new(
        RecordingActuator::default(),
        MemorySink::default(),
        &RunCfg {
            tick_ms: 33,
            watchdog_ms: 2_000,
            max_ticks: None,
        },
    );
    for _ in 0..60 {
        sim.step(Some(323)).unwrap();
    }
    assert_eq!(sim.supervisor().state(), FanState::Running);
    assert_eq!(sim.sampler().window().average(), 320);

    sim.stall(Duration::from_secs(3));
    let r = sim.step(Some(323)).unwrap();
    assert_eq!(sim.resets(), 1);
    assert_eq!(r.average, 0);
    assert_eq!(r.transition.state, FanState::FullSpeed);
    // First conversion after the reset seeds the average again
    assert_eq!(sim.supervisor().average(), 320);
    assert_eq!(sim.sampler().window().count(), 1);
}
