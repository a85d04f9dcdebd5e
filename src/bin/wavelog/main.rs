//! Decodes a wave log, prints the station and sample counts, and optionally
//! a per-station summary and an export of the decoded series.
//!
//! ```text
//! cargo run --bin wavelog -- wave.log 100 --summary --export wave.csv
//! ```

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use wavelog::{
    args::WaveArgs,
    config::DecodeConfig,
    error::WaveLogError,
    export::export_to_path,
    summary::SeriesSummary,
    wave_log::DecodedSeries,
};

fn run(args: WaveArgs) -> Result<(), WaveLogError> {
    if let Some(path) = &args.save_default_config {
        DecodeConfig::save_default(path)?;
        info!("saved default config to {}", path.display());
        return Ok(());
    }

    let cfg = args.decode_config()?;
    let Some(log_path) = &args.log_path else {
        // clap insists on a path unless --save-default-config was given
        return Ok(());
    };

    let series = DecodedSeries::from_path(log_path, &cfg)?;
    println!("stations: {}", series.station_count());
    println!("samples: {}", series.len());

    if args.summary {
        print!("{}", SeriesSummary::from_series(&series).report());
    }

    if let Some(out) = &args.export {
        export_to_path(&series, args.format, out)?;
        info!("exported {:?} to {}", args.format, out.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = WaveArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("wavelog: {}", e);
            ExitCode::FAILURE
        }
    }
}
