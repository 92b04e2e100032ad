//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Keeps the rolling-file writer alive for the life of the process.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Scale monitor CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tally.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read raw readings from stdin and emit monitor events as JSON lines.
    ///
    /// One reading per line: `payload`, `device|payload`, or
    /// `device|payload|status`. Events go to stdout; logs go to stderr.
    Run {
        /// Trust producer status tags instead of computing stability
        #[arg(long, action = ArgAction::SetTrue)]
        tagged: bool,

        /// Device id for lines that do not carry one
        #[arg(long, value_name = "ID")]
        device: Option<String>,
    },
    /// Parse and validate a config file, then exit
    CheckConfig,
}
