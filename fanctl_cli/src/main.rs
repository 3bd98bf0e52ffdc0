mod cli;
mod error_fmt;
mod hw;
mod run;
mod simulate;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use fanctl_config::{Config, Logging};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    if let Err(e) = real_main() {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = match &cli.config {
        Some(path) => fanctl_config::load_file(path)?,
        None => Config::default(),
    };
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging);

    match cli.cmd {
        Commands::Run {
            max_ticks,
            tick_ms,
            terminal,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;
            run::run_cmd(&cfg, max_ticks, tick_ms, terminal, cli.json, shutdown)
        }
        Commands::Simulate { profile, ticks } => {
            simulate::simulate_cmd(&cfg, &profile, ticks, cli.json)
        }
        Commands::SelfCheck => simulate::self_check(&cfg, cli.json),
    }
}

/// Console logs go to stderr so stdout stays machine-readable. An optional
/// JSON file sink follows `[logging]`.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) {
    let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "fanctl.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let res = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = res {
        eprintln!("logging already initialized: {e}");
    }
}
