//! Writes a synthetic wave log.
//!
//! ```text
//! cargo run --bin wavegen -- --out wave.log -n 10 --records 100000
//! ```

use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use wavelog::{args::GenArgs, error::WaveLogError, synth::SyntheticLog, wave_log::WaveLogWriter};

fn run(args: GenArgs) -> Result<(), WaveLogError> {
    let log = SyntheticLog::builder()
        .stations(args.stations)
        .records(args.records)
        .period_us(args.period_us)
        .capacity(args.capacity)
        .sleep_threshold(args.sleep_threshold)
        .seed(args.seed)
        .build();

    let writer = WaveLogWriter::create(&args.outfile, args.stations)?;
    log.write_to(writer)?;
    info!(
        "wrote {} records for {} stations to {}",
        args.records,
        args.stations,
        args.outfile.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = GenArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("wavegen: {}", e);
            ExitCode::FAILURE
        }
    }
}
