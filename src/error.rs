//! The one error type shared by every part of the crate.

use std::{borrow::Cow, fmt};

/// Everything that can go wrong while reading, writing, configuring or
/// exporting a wave log.
#[derive(Debug)]
pub enum WaveLogError {
    /// Returned when the file ends before the 4-byte station count.
    TruncatedHeader,

    /// Returned when asked to read every 0th record.
    InvalidStride(usize),

    /// Returned when a station limit is configured and the header exceeds it.
    TooManyStations {
        /// Station count in the header
        found: u32,
        /// Configured limit
        limit: u32,
    },

    /// Returned when writing a record whose station count disagrees with the
    /// header.
    StationCountMismatch {
        /// Station count in the header
        expected: u32,
        /// Stations in the record
        found: usize,
    },

    /// Returned when generated timestamps would not fit in a `u64`.
    TimestampOverflow {
        /// Records requested
        records: usize,
        /// Microseconds between records
        period_us: u64,
    },

    /// Returned when a full-size record still fails to parse.
    Malformed(nom::error::ErrorKind),

    /// Returned when io fails when reading or writing files.
    IoError(std::io::Error),

    /// Returned when serialization to RON fails.
    RonError(ron::Error),

    /// Returned when deserialization from RON fails.
    RonSpannedError(ron::de::SpannedError),

    /// Returned when the CSV writer fails.
    CsvError(csv::Error),
}

impl fmt::Display for WaveLogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use WaveLogError as WLE;
        let msg = match self {
            WLE::TruncatedHeader => Cow::from("truncated header: couldn't read station count"),
            WLE::InvalidStride(stride) => {
                Cow::from(format!("subsample stride must be at least 1, got {}", stride))
            }
            WLE::TooManyStations { found, limit } => Cow::from(format!(
                "header declares {} stations, limit is {}",
                found, limit
            )),
            WLE::StationCountMismatch { expected, found } => Cow::from(format!(
                "record has {} stations, log expects {}",
                found, expected
            )),
            WLE::TimestampOverflow { records, period_us } => Cow::from(format!(
                "{} records {} us apart run past the largest timestamp",
                records, period_us
            )),
            WLE::Malformed(kind) => Cow::from(format!("malformed record: {:?}", kind)),
            WLE::IoError(error) => Cow::from(format!("io error: {}", error)),
            WLE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            WLE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
            WLE::CsvError(error) => Cow::from(format!("csv error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for WaveLogError {}

impl From<std::io::Error> for WaveLogError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<csv::Error> for WaveLogError {
    fn from(value: csv::Error) -> Self {
        Self::CsvError(value)
    }
}
