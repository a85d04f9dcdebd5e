//! Per-station statistics over a [DecodedSeries], and a plain-text table to
//! print them with.

use crate::record_decoder::StationState;
use crate::wave_log::DecodedSeries;
use std::fmt::Write;

/// Statistics for one station. Shares are fractions of the decoded samples,
/// in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct StationSummary {
    pub mean_usage: f64,
    pub peak_usage: u32,
    pub sleep: f64,
    pub power_down: f64,
    pub power_up: f64,
    pub active: f64,
    /// Samples with a state code outside 1..=4
    pub unknown: f64,
}

impl StationSummary {
    /// Summarise one station's aligned usage and state sequences.
    pub fn from_samples(usage: &[u32], states: &[StationState]) -> Self {
        let mean_usage = if usage.is_empty() {
            0.0
        } else {
            usage.iter().map(|&u| u as f64).sum::<f64>() / usage.len() as f64
        };
        let peak_usage = usage.iter().copied().max().unwrap_or(0);

        let mut counts = [0usize; 5];
        for state in states {
            let slot = match state {
                StationState::Sleep => 0,
                StationState::PowerDown => 1,
                StationState::PowerUp => 2,
                StationState::Active => 3,
                StationState::Unknown(_) => 4,
            };
            counts[slot] += 1;
        }
        let share = |n: usize| {
            if states.is_empty() {
                0.0
            } else {
                n as f64 / states.len() as f64
            }
        };

        StationSummary {
            mean_usage,
            peak_usage,
            sleep: share(counts[0]),
            power_down: share(counts[1]),
            power_up: share(counts[2]),
            active: share(counts[3]),
            unknown: share(counts[4]),
        }
    }
}

/// Statistics for a whole decoded log.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    /// Stations declared in the header
    pub station_count: u32,
    /// Decoded records
    pub samples: usize,
    /// Microseconds, `None` for an empty log
    pub first_timestamp: Option<u64>,
    /// Microseconds, `None` for an empty log
    pub last_timestamp: Option<u64>,
    /// One entry per station, in index order
    pub stations: Vec<StationSummary>,
}

impl SeriesSummary {
    /// Summarise every station in `series`.
    pub fn from_series(series: &DecodedSeries) -> Self {
        let stations = series
            .usage()
            .zip(series.states())
            .map(|(usage, states)| StationSummary::from_samples(usage, states))
            .collect();

        SeriesSummary {
            station_count: series.station_count(),
            samples: series.len(),
            first_timestamp: series.timestamps().first().copied(),
            last_timestamp: series.timestamps().last().copied(),
            stations,
        }
    }

    /// Microseconds between the first and last decoded sample.
    pub fn span_us(&self) -> u64 {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        }
    }

    fn pad(s: String, n: usize) -> String {
        format!("{:^n$}", s)
    }

    /// Render the summary as a text table, one row per station.
    pub fn report(&self) -> String {
        let mut msg = format!(
            "Wave log summary:\n\
            - stations: {}\n\
            - samples: {}\n\
            - span: {:.3} s\n\
            \n\
            id  | mean usage | peak usage | sleep [%] | power down [%] | power up [%] | active [%] | unknown [%]\n\
            ----+------------+------------+-----------+----------------+--------------+------------+------------\n",
            self.station_count,
            self.samples,
            self.span_us() as f64 / 1_000_000.0,
        );
        for (i, station) in self.stations.iter().enumerate() {
            // writing to a String can't fail
            let _ = writeln!(
                msg,
                "{} | {} | {} | {} | {} | {} | {} | {}",
                Self::pad(format!("{}", i), 3),
                Self::pad(format!("{:.2}", station.mean_usage), 10),
                Self::pad(format!("{}", station.peak_usage), 10),
                Self::pad(format!("{:.2}", station.sleep * 100.0), 9),
                Self::pad(format!("{:.2}", station.power_down * 100.0), 14),
                Self::pad(format!("{:.2}", station.power_up * 100.0), 12),
                Self::pad(format!("{:.2}", station.active * 100.0), 10),
                Self::pad(format!("{:.2}", station.unknown * 100.0), 11),
            );
        }
        msg
    }
}
