//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "fanctl", version, about = "Closed-loop fan controller")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop until ctrl-c (or the tick budget runs out)
    Run {
        /// Stop after this many ticks
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
        /// Override timing.tick_ms from the config
        #[arg(long, value_name = "MS")]
        tick_ms: Option<u64>,
        /// Write diagnostic reports as terminal control codes on stderr
        #[arg(long, action = ArgAction::SetTrue)]
        terminal: bool,
    },
    /// Replay a temperature profile (CSV with header `tick,raw`) offline
    Simulate {
        /// Profile CSV
        #[arg(long, value_name = "FILE")]
        profile: PathBuf,
        /// Number of ticks to simulate (default: last profile tick + 100)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
    },
    /// Verify the kick-to-PWM handoff and the configured sensor
    SelfCheck,
}
