//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use heater_core::GainKind;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "heaterctl", version, about = "Multi-heater PID controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/heater_config.toml")]
    pub config: PathBuf,

    /// Emit JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

/// `NAME=CELSIUS` pair from `--target`.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetArg {
    pub heater: String,
    pub celsius: f32,
}

pub fn parse_target(s: &str) -> Result<TargetArg, String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=CELSIUS, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("heater name is empty".into());
    }
    let celsius: f32 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad temperature {value:?}: {e}"))?;
    if !(0.0..=1023.75).contains(&celsius) {
        return Err(format!("temperature {celsius} outside 0..=1023.75 C"));
    }
    Ok(TargetArg {
        heater: name.to_string(),
        celsius,
    })
}

pub fn parse_gain_kind(s: &str) -> Result<GainKind, String> {
    GainKind::parse(s).ok_or_else(|| format!("unknown gain {s:?} (expected p, i, d or i_limit)"))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tick loop against the simulated plant
    Run {
        /// Target temperature for a heater, repeatable
        #[arg(long = "target", value_name = "NAME=CELSIUS", value_parser = parse_target)]
        targets: Vec<TargetArg>,
        /// Stop after this many ticks (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Do not pace ticks to wall time
        #[arg(long, action = ArgAction::SetTrue)]
        fast: bool,
        /// Print a status line every N ticks (0 = only at the end)
        #[arg(long, value_name = "N", default_value_t = 4)]
        every: u64,
        /// Print loop latency stats on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux: Attempts SCHED_FIFO priority and calls mlockall to keep the process resident. Requires CAP_SYS_NICE / CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'.\n\nmacOS: Only mlockall is applied."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO on Linux (1..=max); ignored elsewhere
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
        /// Simulator: detach the element of this heater from its sensor
        #[arg(long, value_name = "NAME")]
        detach: Vec<String>,
        /// Simulator: unplug the sensor of this heater
        #[arg(long, value_name = "NAME")]
        disconnect: Vec<String>,
        /// Simulator: weld the output of this heater on
        #[arg(long, value_name = "NAME")]
        stick: Vec<String>,
        /// Tick at which simulator faults are injected
        #[arg(long, value_name = "N", default_value_t = 0)]
        fault_after: u64,
    },
    /// Change one gain of a heater and persist it to the gains file
    SetGain {
        /// Heater name
        heater: String,
        /// p | i | d | i_limit
        #[arg(value_parser = parse_gain_kind)]
        kind: GainKind,
        /// New value in internal fixed-point units
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Print configured heaters with their effective gains
    Show {
        /// Only this heater
        #[arg(long, value_name = "NAME")]
        heater: Option<String>,
    },
    /// Quick health check (config, gains file, simulated plant)
    SelfCheck,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bed=60", "bed", 60.0)]
    #[case(" extruder = 215.5 ", "extruder", 215.5)]
    #[case("off=0", "off", 0.0)]
    fn target_parses(#[case] s: &str, #[case] name: &str, #[case] c: f32) {
        let t = parse_target(s).unwrap();
        assert_eq!(t.heater, name);
        assert!((t.celsius - c).abs() < f32::EPSILON);
    }

    #[rstest]
    #[case("bed")]
    #[case("=60")]
    #[case("bed=hot")]
    #[case("bed=-5")]
    #[case("bed=2000")]
    fn target_rejects(#[case] s: &str) {
        assert!(parse_target(s).is_err());
    }

    #[test]
    fn gain_kind_names() {
        assert_eq!(parse_gain_kind("I_LIMIT").unwrap(), GainKind::ILimit);
        assert!(parse_gain_kind("k").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
