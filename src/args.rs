//! Commandline argument parsers for the `wavelog` and `wavegen` binaries.

use crate::{config::DecodeConfig, error::WaveLogError, export::ExportFormat};
use clap::Parser;
use std::path::PathBuf;

/// Decode a wave log and print what's in it.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct WaveArgs {
    /// Path to the binary wave log
    #[arg(required_unless_present = "save_default_config")]
    pub log_path: Option<PathBuf>,

    /// Read every Nth record only, overrides the config file
    pub subsample_stride: Option<usize>,

    /// Path to a RON decode config
    #[arg(long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Write the default decode config to this path and exit
    #[arg(long, value_name = "path")]
    pub save_default_config: Option<PathBuf>,

    /// Refuse logs whose header declares more stations than this
    #[arg(long, value_name = "u32")]
    pub max_stations: Option<u32>,

    /// Print per-station usage and state statistics
    #[arg(short, long)]
    pub summary: bool,

    /// Write the decoded series to this path
    #[arg(short, long, value_name = "path")]
    pub export: Option<PathBuf>,

    /// Format for --export
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,
}

impl WaveArgs {
    /// Build the decode config: the config file if one was given, defaults
    /// otherwise, then any overrides from the commandline.
    pub fn decode_config(&self) -> Result<DecodeConfig, WaveLogError> {
        let mut cfg = match &self.config {
            Some(path) => DecodeConfig::from_path(path)?,
            None => DecodeConfig::default(),
        };
        if let Some(stride) = self.subsample_stride {
            cfg.stride = stride;
        }
        if self.max_stations.is_some() {
            cfg.max_stations = self.max_stations;
        }
        cfg.validate()
    }
}

/// Write a synthetic wave log.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct GenArgs {
    /// Filename for the wave log to be written to
    #[arg(short = 'o', long = "out")]
    pub outfile: PathBuf,

    /// Number of stations in each record
    #[arg(short = 'n', long, default_value_t = 4)]
    pub stations: u32,

    /// Number of records to write
    #[arg(short, long, default_value_t = 1000)]
    pub records: usize,

    /// Time between records, in microseconds
    #[arg(short, long, default_value_t = 1000)]
    pub period_us: u64,

    /// Largest usage a station can report
    #[arg(short, long, default_value_t = 273)]
    pub capacity: u32,

    /// Usage percentage under which a station goes to sleep
    #[arg(long, default_value_t = 20)]
    pub sleep_threshold: u32,

    /// Seed for the random number generator
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}
