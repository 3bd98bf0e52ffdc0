//! `fanctl run`: the live control loop.

use crate::error_fmt::{format_error_json, humanize};
use crate::hw::{self, FailSafe};
use eyre::Result;
use fanctl_config::Config;
use fanctl_core::{OnHang, RunCfg, RunSummary, exit_on_hang, run_supervised};
use fanctl_hardware::{TerminalSink, TracingSink};
use fanctl_traits::MonotonicClock;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_cmd(
    cfg: &Config,
    max_ticks: Option<u64>,
    tick_ms: Option<u64>,
    terminal: bool,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut rc: RunCfg = cfg.into();
    if let Some(ms) = tick_ms {
        if ms == 0 {
            eyre::bail!("--tick-ms must be >= 1");
        }
        if rc.watchdog_ms <= ms {
            eyre::bail!("--tick-ms {ms} does not fit inside timing.watchdog_ms {}", rc.watchdog_ms);
        }
        rc.tick_ms = ms;
    }
    rc.max_ticks = max_ticks;

    let (sensor, fan, failsafe) = hw::assemble(cfg, rc.tick_ms)?;
    let on_hang = report_and_exit(failsafe, json);
    let clock = MonotonicClock::new();
    let summary = if terminal {
        let sink = TerminalSink::new(std::io::stderr());
        run_supervised(sensor, fan, sink, &rc, shutdown, clock, on_hang)?
    } else {
        run_supervised(sensor, fan, TracingSink::new(), &rc, shutdown, clock, on_hang)?
    };
    print_summary(&summary, json);
    Ok(())
}

/// Print the hang the same way `main` prints errors, then hand over to the
/// core fail-safe exit.
fn report_and_exit(failsafe: Option<FailSafe>, json: bool) -> OnHang {
    let exit = exit_on_hang(failsafe);
    Box::new(move |err| {
        let report = eyre::Report::new(err.clone());
        if json {
            eprintln!("{}", format_error_json(&report));
        } else {
            eprintln!("{}", humanize(&report));
        }
        exit(err);
    })
}

fn print_summary(s: &RunSummary, json: bool) {
    if json {
        let line = serde_json::json!({
            "ticks": s.ticks,
            "resets": s.resets,
            "sensor_failures": s.sensor_failures,
            "final_state": s.final_state.name(),
            "final_average": s.final_average,
            "final_duty": s.final_duty,
        });
        println!("{line}");
    } else {
        println!(
            "stopped after {} ticks: state={} average={} duty={} resets={} sensor_failures={}",
            s.ticks, s.final_state, s.final_average, s.final_duty, s.resets, s.sensor_failures
        );
    }
}
