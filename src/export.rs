//! Writes a [DecodedSeries] out in a format other tools can pick up: CSV
//! with one row per record, or the RON form of the whole series.

use crate::{error::WaveLogError, wave_log::DecodedSeries, TransposableIter};
use clap::ValueEnum;
use ron::ser::PrettyConfig;
use std::{fs::File, io::Write, path::Path};

/// Output formats for [export_series].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// `timestamp,station0_usage,station0_state,...`, one row per record
    Csv,
    /// The series as RON, readable with [ron::de::from_reader]
    Ron,
}

/// Column names for the CSV export.
fn csv_header(station_count: usize) -> Vec<String> {
    let mut header = Vec::with_capacity(1 + 2 * station_count);
    header.push("timestamp".to_owned());
    for i in 0..station_count {
        header.push(format!("station{}_usage", i));
        header.push(format!("station{}_state", i));
    }
    header
}

fn write_csv(series: &DecodedSeries, writer: impl Write) -> Result<(), WaveLogError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(csv_header(series.usage().len()))?;

    let mut columns: Vec<Vec<String>> = Vec::with_capacity(1 + 2 * series.usage().len());
    columns.push(series.timestamps().iter().map(|t| t.to_string()).collect());
    for (usage, states) in series.usage().zip(series.states()) {
        columns.push(usage.iter().map(|u| u.to_string()).collect());
        columns.push(states.iter().map(|s| s.to_string()).collect());
    }

    for row in columns.transpose() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `series` to `writer` in the requested format.
pub fn export_series(
    series: &DecodedSeries,
    format: ExportFormat,
    writer: impl Write,
) -> Result<(), WaveLogError> {
    match format {
        ExportFormat::Csv => write_csv(series, writer),
        ExportFormat::Ron => ron::ser::to_writer_pretty(writer, series, PrettyConfig::default())
            .map_err(WaveLogError::RonError),
    }
}

/// Write `series` to a new file at `path`.
pub fn export_to_path(
    series: &DecodedSeries,
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<(), WaveLogError> {
    let handle = File::create(path).map_err(WaveLogError::IoError)?;
    export_series(series, format, std::io::BufWriter::new(handle))
}
