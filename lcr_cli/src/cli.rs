//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "lcrchar",
    version,
    about = "LCR characterization over a temperature profile"
)]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/lcr_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty; summaries and errors become JSON too
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
    /// Steer the chamber along the setpoint profile while recording the meter
    Run {
        /// Override runner.iterations: profile cycles before stopping
        #[arg(long, value_name = "N")]
        iterations: Option<u64>,
        /// Override output.directory: where the run directory is created
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Decode a raw meter capture, one line per frame
    Decode {
        /// File holding the raw bytes read from the meter's serial port
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Validate the config and report which devices would be used
    SelfCheck,
}
