mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use tracker_config::{Config, Logging};
use tracker_core::TrackerError;
use tracker_hardware::PlantParams;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::SimOptions;

fn config_error(path: &Path, what: &str) -> TrackerError {
    TrackerError::Config(format!("{what} {}", path.display()))
}

/// Read, parse and validate the config file.
fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::Report::new(e).wrap_err(config_error(path, "reading")))?;
    let cfg = tracker_config::load_toml(&text)
        .map_err(|e| eyre::Report::new(e).wrap_err(config_error(path, "parsing")))?;
    cfg.validate()
        .map_err(|e| e.wrap_err(config_error(path, "validating")))?;
    Ok(cfg)
}

/// Console logs go to stderr (JSON or compact); `[logging].file` adds a JSON
/// file sink with the configured rotation.
fn init_tracing(json: bool, level: Option<&str>, logging: Option<&Logging>) {
    let level = level
        .or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let file_writer = logging.and_then(|l| l.file.as_deref()).map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "tracker.log".into(), |n| n.to_owned());
        let appender = match logging.and_then(|l| l.rotation.as_deref()) {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        writer
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().compact().with_writer(std::io::stderr)))
        .with(file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
        .init();
}

fn dispatch(cli: &Cli, cfg: &Config, shutdown: &AtomicBool) -> eyre::Result<()> {
    match &cli.cmd {
        Commands::Simulate {
            duration_ms,
            sun_h,
            sun_v,
            sun_rate_h,
            sun_rate_v,
            start_h,
            start_v,
            ambient,
            presses,
            boot_cause,
            wake_cause,
            max_sleeps,
            fail_bridge_at,
            jsonl,
        } => {
            let opts = SimOptions {
                duration_ms: *duration_ms,
                plant: PlantParams {
                    sun_h_deg: *sun_h,
                    sun_v_deg: *sun_v,
                    sun_rate_h_deg_s: *sun_rate_h,
                    sun_rate_v_deg_s: *sun_rate_v,
                    axis_h_deg: *start_h,
                    axis_v_deg: *start_v,
                    ambient: *ambient,
                    ..PlantParams::default()
                },
                presses: presses.clone(),
                boot_cause: (*boot_cause).into(),
                wake_cause: (*wake_cause).into(),
                max_sleeps: *max_sleeps,
                fail_bridge_at: *fail_bridge_at,
                jsonl: *jsonl,
            };
            run::simulate(cfg, &opts, shutdown, cli.json)
                .wrap_err("simulation failed")
                .map(|_| ())
        }
        Commands::Replay { trace, jsonl } => run::replay(cfg, trace, *jsonl, shutdown, cli.json)
            .wrap_err("replay failed")
            .map(|_| ()),
        Commands::CheckConfig => run::check_config(cfg, &cli.config, cli.json),
        Commands::SelfCheck => run::self_check(cfg, shutdown, cli.json),
    }
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    // Loaded before tracing so the [logging] section can shape the subscriber.
    let loaded = load_config(&cli.config);
    init_tracing(
        cli.json,
        cli.log_level.as_deref(),
        loaded.as_ref().ok().map(|c| &c.logging),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let result = loaded.and_then(|cfg| {
        tracing::debug!(config = %cli.config.display(), "config loaded");
        dispatch(&cli, &cfg, &shutdown)
    });
    if let Err(err) = result {
        tracing::debug!(error = ?err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
