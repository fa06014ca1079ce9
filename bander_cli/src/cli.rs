//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "bander", version, about = "Edge-banding line controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/bander_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Knobs for the simulated line backend.
#[derive(Args, Debug, Clone)]
pub struct SimOpts {
    /// Use the simulated line even when built with hardware support
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,
    /// Length of each simulated piece
    #[arg(long, value_name = "MM", default_value_t = 600.0)]
    pub sim_piece_mm: f64,
    /// Free chain between simulated pieces (keep above line length + egress margin)
    #[arg(long, value_name = "MM", default_value_t = 1500.0)]
    pub sim_gap_mm: f64,
    /// Stop feeding after this many pieces
    #[arg(long, value_name = "N")]
    pub sim_pieces: Option<u32>,
    /// Initial roller temperature
    #[arg(long, value_name = "CELSIUS", default_value_t = 20.0)]
    pub sim_start_temp: f64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop: JSON commands on stdin, JSON snapshots on stdout
    Run {
        /// Stop after this many control cycles (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Print cycle statistics on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        #[command(flatten)]
        sim: SimOpts,
    },
    /// Validate config, open the backend and take one sample
    SelfCheck {
        #[command(flatten)]
        sim: SimOpts,
    },
}
