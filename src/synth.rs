//! Generates wave logs that look like what the station simulator writes, so
//! the decoder and its tools can be tried out without running a simulation.
//!
//! Every station carries a usage figure that wanders up and down. When it
//! drops under the sleep threshold the station powers down for one sample
//! and then sleeps with zero usage. A sleeping station wakes up at random,
//! spends one sample powering up, and is active again.

use crate::{
    error::WaveLogError,
    record_decoder::{StationSample, StationState, WaveRecord},
    wave_log::WaveLogWriter,
};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::Write;

/// Settings for a synthetic wave log. Build one with
/// [SyntheticLog::builder()].
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticLog {
    station_count: u32,
    record_count: usize,
    period_us: u64,
    capacity: u32,
    sleep_threshold: u32,
    wake_chance: f64,
    seed: u64,
}

impl SyntheticLog {
    /// Make a [SyntheticLogBuilder] with default settings.
    pub fn builder() -> SyntheticLogBuilder {
        SyntheticLogBuilder::new()
    }

    /// Number of stations in each record.
    pub fn station_count(&self) -> u32 {
        self.station_count
    }

    /// Produce every record of the log. The same settings always give the
    /// same records. Fails if the last timestamp would overflow.
    pub fn generate(&self) -> Result<Vec<WaveRecord>, WaveLogError> {
        (self.record_count.saturating_sub(1) as u64)
            .checked_mul(self.period_us)
            .ok_or(WaveLogError::TimestampOverflow {
                records: self.record_count,
                period_us: self.period_us,
            })?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let max_step = (self.capacity / 20).max(1) as i64;
        let sleep_below = self.capacity as u64 * self.sleep_threshold as u64 / 100;

        let mut stations: Vec<StationSample> = (0..self.station_count)
            .map(|_| StationSample {
                usage: rng.gen_range(0..=self.capacity),
                state: StationState::Active,
            })
            .collect();

        let records: Vec<WaveRecord> = (0..self.record_count)
            .map(|k| {
                for station in stations.iter_mut() {
                    step_station(
                        station,
                        &mut rng,
                        max_step,
                        self.capacity,
                        sleep_below,
                        self.wake_chance,
                    );
                }
                WaveRecord {
                    timestamp: k as u64 * self.period_us,
                    stations: stations.clone(),
                }
            })
            .collect();
        Ok(records)
    }

    /// Write the generated log through `writer`, handing back the inner
    /// writer once it's flushed.
    pub fn write_to<W: Write>(&self, mut writer: WaveLogWriter<W>) -> Result<W, WaveLogError> {
        for record in self.generate()? {
            writer.write_record(&record)?;
        }
        debug!(
            "generated {} records for {} stations",
            self.record_count, self.station_count
        );
        writer.finish()
    }
}

fn step_station(
    station: &mut StationSample,
    rng: &mut StdRng,
    max_step: i64,
    capacity: u32,
    sleep_below: u64,
    wake_chance: f64,
) {
    match station.state {
        StationState::Active => {
            let step = rng.gen_range(-max_step..=max_step);
            let usage = (station.usage as i64 + step).clamp(0, capacity as i64);
            station.usage = usage as u32;
            if (station.usage as u64) < sleep_below {
                station.state = StationState::PowerDown;
            }
        }
        StationState::PowerDown => {
            station.usage = 0;
            station.state = StationState::Sleep;
        }
        StationState::Sleep => {
            if rng.gen_bool(wake_chance) {
                station.state = StationState::PowerUp;
            }
        }
        StationState::PowerUp | StationState::Unknown(_) => {
            station.usage = rng.gen_range(sleep_below as u32..=capacity);
            station.state = StationState::Active;
        }
    }
}

/// Builder for [SyntheticLog].
#[derive(Debug, Clone)]
pub struct SyntheticLogBuilder {
    log: SyntheticLog,
}

impl Default for SyntheticLogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticLogBuilder {
    /// Four stations, a thousand records one millisecond apart, 273
    /// resources per station and a 20% sleep threshold.
    fn new() -> Self {
        SyntheticLogBuilder {
            log: SyntheticLog {
                station_count: 4,
                record_count: 1000,
                period_us: 1000,
                capacity: 273,
                sleep_threshold: 20,
                wake_chance: 0.05,
                seed: 0,
            },
        }
    }

    /// Sets the number of stations.
    pub fn stations(mut self, station_count: u32) -> Self {
        self.log.station_count = station_count;
        self
    }

    /// Sets the number of records.
    pub fn records(mut self, record_count: usize) -> Self {
        self.log.record_count = record_count;
        self
    }

    /// Sets the time between records, in microseconds.
    pub fn period_us(mut self, period_us: u64) -> Self {
        self.log.period_us = period_us;
        self
    }

    /// Sets the largest usage a station can report.
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.log.capacity = capacity;
        self
    }

    /// Sets the usage percentage under which a station goes to sleep,
    /// clamped to 100.
    pub fn sleep_threshold(mut self, percent: u32) -> Self {
        self.log.sleep_threshold = percent.min(100);
        self
    }

    /// Sets the chance per sample that a sleeping station wakes, clamped to
    /// `[0, 1]`.
    pub fn wake_chance(mut self, chance: f64) -> Self {
        self.log.wake_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.log.seed = seed;
        self
    }

    /// Finish building.
    pub fn build(self) -> SyntheticLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeConfig;
    use crate::wave_log::{DecodedSeries, WaveLogReader};
    use std::io::Cursor;

    #[test]
    fn decodes_to_what_was_generated() {
        let log = SyntheticLog::builder()
            .stations(3)
            .records(250)
            .seed(11)
            .build();
        let bytes = log
            .write_to(WaveLogWriter::new(Vec::new(), log.station_count()).unwrap())
            .unwrap();
        assert_eq!(bytes.len(), 4 + 250 * (8 + 3 * 5));

        let decoded: Vec<WaveRecord> = WaveLogReader::new(Cursor::new(bytes), 1)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, log.generate().unwrap());
    }

    #[test]
    fn same_seed_same_log() {
        let a = SyntheticLog::builder().seed(3).build().generate().unwrap();
        let b = SyntheticLog::builder().seed(3).build().generate().unwrap();
        let c = SyntheticLog::builder().seed(4).build().generate().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn usage_and_states_stay_sensible() {
        let log = SyntheticLog::builder()
            .stations(5)
            .records(2000)
            .capacity(100)
            .sleep_threshold(40)
            .wake_chance(0.2)
            .period_us(250)
            .seed(1)
            .build();
        let records = log.generate().unwrap();

        for (k, record) in records.iter().enumerate() {
            assert_eq!(record.timestamp, k as u64 * 250);
            for station in &record.stations {
                assert!(station.usage <= 100);
                assert!(!matches!(station.state, StationState::Unknown(_)));
                if station.state == StationState::Sleep {
                    assert_eq!(station.usage, 0);
                }
            }
        }
    }

    #[test]
    fn subsampled_from_disk() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        let log = SyntheticLog::builder().stations(2).records(95).build();
        log.write_to(WaveLogWriter::create(tempfile.path(), 2).unwrap())
            .unwrap();

        let series = DecodedSeries::from_path(tempfile.path(), &DecodeConfig::with_stride(10))
            .unwrap();
        let expected: Vec<u64> = log
            .generate()
            .unwrap()
            .iter()
            .step_by(10)
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(series.len(), 10);
        assert_eq!(series.timestamps(), expected.as_slice());
    }

    #[test]
    fn overflowing_timestamps_rejected() {
        let log = SyntheticLog::builder()
            .records(3)
            .period_us(u64::MAX)
            .build();
        assert!(matches!(
            log.generate(),
            Err(WaveLogError::TimestampOverflow {
                records: 3,
                period_us: u64::MAX
            })
        ));
        assert!(matches!(
            log.write_to(WaveLogWriter::new(Vec::new(), log.station_count()).unwrap()),
            Err(WaveLogError::TimestampOverflow { .. })
        ));

        // the last timestamp lands exactly on u64::MAX
        let log = SyntheticLog::builder()
            .stations(1)
            .records(2)
            .period_us(u64::MAX)
            .build();
        let records = log.generate().unwrap();
        assert_eq!(records[1].timestamp, u64::MAX);
    }
}
