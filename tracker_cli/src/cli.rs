//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracker_traits::WakeCause;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tracker", version, about = "Dual-axis solar tracker")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tracker_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Wake cause reported by the simulated power manager.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum WakeArg {
    PowerOn,
    Timer,
    External,
}

impl From<WakeArg> for WakeCause {
    fn from(w: WakeArg) -> Self {
        match w {
            WakeArg::PowerOn => WakeCause::PowerOn,
            WakeArg::Timer => WakeCause::Timer,
            WakeArg::External => WakeCause::External,
        }
    }
}

/// A scripted touch: `AT_MS:HOLD_MS`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Press {
    pub at_ms: u64,
    pub hold_ms: u64,
}

fn parse_press(s: &str) -> Result<Press, String> {
    let (at, hold) = s
        .split_once(':')
        .ok_or_else(|| format!("expected AT_MS:HOLD_MS, got {s:?}"))?;
    let at_ms = at
        .trim()
        .parse()
        .map_err(|e| format!("press time {at:?}: {e}"))?;
    let hold_ms = hold
        .trim()
        .parse()
        .map_err(|e| format!("press hold {hold:?}: {e}"))?;
    Ok(Press { at_ms, hold_ms })
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track a simulated sun on a simulated two-axis mount
    Simulate {
        /// Awake time to simulate (ms of control ticks)
        #[arg(long, value_name = "MS", default_value_t = 60_000)]
        duration_ms: u64,
        /// Sun azimuth and elevation at start (degrees)
        #[arg(long, value_name = "DEG", default_value_t = 20.0, allow_hyphen_values = true)]
        sun_h: f32,
        #[arg(long, value_name = "DEG", default_value_t = 40.0, allow_hyphen_values = true)]
        sun_v: f32,
        /// Sun drift per axis (degrees per second)
        #[arg(long, value_name = "DEG_S", default_value_t = 0.0, allow_hyphen_values = true)]
        sun_rate_h: f32,
        #[arg(long, value_name = "DEG_S", default_value_t = 0.0, allow_hyphen_values = true)]
        sun_rate_v: f32,
        /// Mount position at start (degrees)
        #[arg(long, value_name = "DEG", default_value_t = 0.0, allow_hyphen_values = true)]
        start_h: f32,
        #[arg(long, value_name = "DEG", default_value_t = 30.0, allow_hyphen_values = true)]
        start_v: f32,
        /// Raw count a channel reads facing the sun (lower simulates dusk)
        #[arg(long, value_name = "COUNT", default_value_t = 3_000)]
        ambient: u32,
        /// Scripted button touch, repeatable
        #[arg(long = "press", value_name = "AT_MS:HOLD_MS", value_parser = parse_press)]
        presses: Vec<Press>,
        /// Wake cause reported at boot
        #[arg(long, value_enum, default_value_t = WakeArg::PowerOn)]
        boot_cause: WakeArg,
        /// Wake cause reported after each low-power cycle
        #[arg(long, value_enum, default_value_t = WakeArg::Timer)]
        wake_cause: WakeArg,
        /// Stop after this many low-power cycles
        #[arg(long, value_name = "N")]
        max_sleeps: Option<u32>,
        /// Make the horizontal bridge fail from this tick on
        #[arg(long, value_name = "MS")]
        fail_bridge_at: Option<u64>,
        /// Write axis and environment records to stdout as JSON lines
        #[arg(long, action = ArgAction::SetTrue)]
        jsonl: bool,
    },
    /// Feed a recorded light trace through the controller
    Replay {
        /// Light trace CSV (t_ms,h_a,h_b,v_a,v_b)
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Write axis and environment records to stdout as JSON lines
        #[arg(long, action = ArgAction::SetTrue)]
        jsonl: bool,
    },
    /// Load and validate the config, then exit
    CheckConfig,
    /// Quick closed-loop health check against the simulated plant
    SelfCheck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_parses_at_and_hold() {
        assert_eq!(
            parse_press("1000:2000"),
            Ok(Press {
                at_ms: 1_000,
                hold_ms: 2_000
            })
        );
        assert!(parse_press("1000").is_err());
        assert!(parse_press("x:5").is_err());
    }
}
