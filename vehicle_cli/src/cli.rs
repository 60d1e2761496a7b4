//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;
use vehicle_core::Direction;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file used when `--config` is not given. A missing default file
/// falls back to built-in defaults.
pub const DEFAULT_CONFIG: &str = "etc/vehicle.toml";

#[derive(Parser, Debug)]
#[command(name = "vehicle", version, about = "Vehicle instrumentation controller")]
pub struct Cli {
    /// Path to config TOML [default: etc/vehicle.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and print as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory-locking mode applied together with `--rt`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock pages mapped now (MCL_CURRENT)
    Current,
    /// Lock current and future pages (MCL_CURRENT|MCL_FUTURE)
    All,
}

/// Direction of travel as accepted on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DirArg {
    Unknown,
    Forward,
    Backward,
    Left,
    Right,
}

impl From<DirArg> for Direction {
    fn from(d: DirArg) -> Self {
        match d {
            DirArg::Unknown => Self::Unknown,
            DirArg::Forward => Self::Forward,
            DirArg::Backward => Self::Backward,
            DirArg::Left => Self::Left,
            DirArg::Right => Self::Right,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start every sensor task and report state changes until stopped
    Run {
        /// Stop after this many milliseconds (default: run until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Inject one simulated impact at this accelerometer read index
        #[arg(long, value_name = "SAMPLE")]
        sim_crash_at: Option<u64>,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux: SCHED_FIFO for the sampling threads and mlockall(MCL_CURRENT|MCL_FUTURE). Usually needs elevated privileges or raised rtprio/memlock limits; failures are logged and the run continues."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled (clamped to the platform range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode when --rt is enabled
        #[arg(long, value_enum, default_value_t = RtLock::All)]
        rt_lock: RtLock,
    },
    /// Read every sensor once and report the result
    SelfCheck,
    /// Print the proximity zone for a distance and direction
    Classify {
        /// Distance to the obstacle in centimetres
        #[arg(long, value_name = "CM")]
        distance: u32,
        /// Direction of travel
        #[arg(long, value_enum)]
        direction: DirArg,
    },
}
