//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub const DEFAULT_CONFIG_PATH: &str = "etc/coordkit.toml";

#[derive(Parser, Debug)]
#[command(name = "coordkit", version, about = "Coordinate toolkit CLI")]
pub struct Cli {
    /// Path to config TOML [default: etc/coordkit.toml, built-in defaults if absent]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project a point by bearing and distance (planar)
    Project {
        #[arg(long, allow_negative_numbers = true)]
        easting: f64,
        #[arg(long, allow_negative_numbers = true)]
        northing: f64,
        /// Degrees clockwise from grid north
        #[arg(long, allow_negative_numbers = true)]
        bearing: f64,
        #[arg(long, allow_negative_numbers = true)]
        distance: f64,
        /// CRS code of the input point (default: crs.default_code)
        #[arg(long, value_name = "CODE")]
        crs: Option<String>,
    },
    /// Bearing and distance between two planar points
    Bearing {
        #[arg(long, allow_negative_numbers = true)]
        from_easting: f64,
        #[arg(long, allow_negative_numbers = true)]
        from_northing: f64,
        #[arg(long, allow_negative_numbers = true)]
        to_easting: f64,
        #[arg(long, allow_negative_numbers = true)]
        to_northing: f64,
    },
    /// Transform a coordinate between two CRS codes
    Transform {
        #[arg(long, value_name = "CODE")]
        from: String,
        #[arg(long, value_name = "CODE")]
        to: String,
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },
    /// Browse the CRS catalog
    Crs {
        #[command(subcommand)]
        cmd: CrsCommands,
    },
    /// Take one position fix from the configured provider
    Locate,
    /// Run an accuracy-weighted averaging session
    Average {
        /// Override sampling.warmup_ms
        #[arg(long, value_name = "MS")]
        warmup_ms: Option<u64>,
        /// Override sampling.collection_ms
        #[arg(long, value_name = "MS")]
        collection_ms: Option<u64>,
        /// Replay fixes from CSV instead of the configured provider
        #[arg(long, value_name = "FILE")]
        fixture: Option<PathBuf>,
        /// Extra capture batches to run after collection
        #[arg(long, value_name = "N", default_value_t = 0)]
        extra_batches: usize,
        /// Drop accepted sample INDEX before finalizing (repeatable)
        #[arg(long = "drop", value_name = "INDEX")]
        drop: Vec<usize>,
        /// Name for the resulting record
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CrsCommands {
    /// List known CRS, optionally filtered by code or name
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show one CRS definition
    Show { code: String },
}
