//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "proxi", version, about = "Pedestrian proximity sensing engine")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/proxi.toml")]
    pub config: PathBuf,

    /// Print cycle lines and errors as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the fusion engine against the configured sensors
    Run {
        /// Stop after N cycles (overrides runner.max_cycles; 0 runs until Ctrl-C)
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Drive the loop from a simulated clock instead of wall time
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Drive the loop from a simulated clock instead of wall time.\n\nEach cycle advances the clock by the cycle period without sleeping, so simulated walks and recorded traces play back as fast as the CPU allows. Cannot be combined with runner.threaded, whose sampler threads need real time."
        )]
        virtual_time: bool,
        /// Only print cycles where the combined decision changed
        #[arg(long, action = ArgAction::SetTrue)]
        changes_only: bool,
    },
    /// Feed a recorded range trace through one sensor's detector
    Replay {
        /// Trace CSV with headers t_ms,distance_mm
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Sensor slot whose configuration the detector uses (default: primary, else the first entry)
        #[arg(long, value_name = "N")]
        slot: Option<usize>,
    },
    /// Validate configuration and poll every source once
    SelfCheck,
}
