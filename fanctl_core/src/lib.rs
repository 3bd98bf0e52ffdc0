#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core fan control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `fanctl_traits` capabilities:
//! `TemperatureSensor`, `Actuator`, `Watchdog` and `DiagnosticSink`.
//!
//! ## Architecture
//!
//! - **Sampling**: 20-sample block average with calibration offset (`sampler`)
//! - **Control**: four-state fan machine and duty mapping (`controller`)
//! - **Scheduling**: per-tick control, report cadence, watchdog refresh (`supervisor`)
//! - **Supervision**: software watchdog window and reset path (`watchdog`)
//! - **Orchestration**: threaded real-time loop and deterministic simulation (`runner`)
//!
//! ## Integer arithmetic
//!
//! Temperatures stay on the calibrated raw ADC scale (≈1 unit/°C, 300 ≈ 25 °C)
//! and duty values are 8-bit compare values; no floating point is involved in
//! the control path.

pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod sampler;
pub mod supervisor;
pub mod util;
pub mod watchdog;

pub use config::RunCfg;
pub use controller::{Command, FanController, FanState, Transition, running_duty, transition};
pub use error::{FanError, Result};
pub use runner::{RunSummary, Simulation, run, run_supervised};
pub use sampler::{AdcWorker, RunningAverage, SharedAverage, TemperatureSampler};
pub use supervisor::{Supervisor, TickReport};
pub use watchdog::{HANG_EXIT_CODE, OnHang, SoftWatchdog, WatchdogMonitor, exit_on_hang};
