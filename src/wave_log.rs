//! This module provides an API to read and write wave logs, the binary
//! telemetry format the station simulator dumps while it runs. The files
//! have the following structure:
//!
//! - First there is a header: the number of stations, as a little-endian
//!   `u32`.
//! - Then come the records, back to back, each `8 + station_count * 5`
//!   bytes long:
//!   - the timestamp in microseconds, a little-endian `u64`
//!   - for each station, in index order, its usage (little-endian `u32`)
//!     followed by its state (one byte, see [StationState])
//!
//! ```text
//! [station_count][timestamp|usage state|usage state|...][timestamp|...]...
//! ```
//!
//! Logs get large, so [WaveLogReader] can subsample them: with a stride of
//! `S` it reads one record and skips the next `S - 1`. Short skips are read
//! through and discarded, long ones are seeked over.
//!
//! The station count is not validated beyond
//! [DecodeConfig::max_stations](crate::config::DecodeConfig). A corrupt
//! header gives a huge record size, which then simply reads as a log with no
//! complete records, or as garbage values.

use crate::{
    config::DecodeConfig,
    error::WaveLogError,
    record_decoder::{
        decode_header, decode_record, StationState, WaveHeader, WaveRecord, HEADER_SIZE,
    },
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};

/// Skips shorter than this many bytes are read through instead of seeked
/// over. A seek on a [BufReader] discards its buffer.
const SEEK_THRESHOLD: i64 = 64 * 1024;

/// Read at most `len` bytes into `buf`, stopping early only at end of file.
fn read_chunk<R: Read>(reader: &mut R, len: u64, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    reader.by_ref().take(len).read_to_end(buf)
}

/// Streams [WaveRecord]s out of a wave log, every `stride`th one.
///
/// The iterator ends at the first record that can't be read in full. A
/// partial trailing record is dropped without an error.
#[derive(Debug)]
pub struct WaveLogReader<R> {
    reader: R,
    header: WaveHeader,
    /// Bytes to seek over after each record. `None` when the jump doesn't
    /// fit in a file offset.
    skip: Option<i64>,
    buf: Vec<u8>,
    records_read: usize,
    finished: bool,
}

impl WaveLogReader<BufReader<File>> {
    /// Open the wave log at `path` and read its header.
    pub fn from_path(path: impl AsRef<Path>, cfg: &DecodeConfig) -> Result<Self, WaveLogError> {
        let handle = File::open(path).map_err(WaveLogError::IoError)?;
        Self::with_config(BufReader::new(handle), cfg)
    }
}

impl<R: Read + Seek> WaveLogReader<R> {
    /// Read the header from `reader` and prepare to read every `stride`th
    /// record.
    pub fn new(reader: R, stride: usize) -> Result<Self, WaveLogError> {
        Self::with_config(reader, &DecodeConfig::with_stride(stride))
    }

    /// Read the header from `reader`, applying all of `cfg`.
    pub fn with_config(mut reader: R, cfg: &DecodeConfig) -> Result<Self, WaveLogError> {
        let stride = cfg.stride;
        if stride < 1 {
            return Err(WaveLogError::InvalidStride(stride));
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE);
        read_chunk(&mut reader, HEADER_SIZE as u64, &mut buf).map_err(WaveLogError::IoError)?;
        let header = decode_header(&buf).ok_or(WaveLogError::TruncatedHeader)?;
        cfg.check_station_count(header.station_count)?;

        let skip = (stride as u64 - 1)
            .checked_mul(header.record_size())
            .and_then(|bytes| i64::try_from(bytes).ok());

        debug!(
            "wave log header: {} stations, {} byte records, skipping {:?} bytes between reads",
            header.station_count,
            header.record_size(),
            skip
        );

        Ok(WaveLogReader {
            reader,
            header,
            skip,
            buf,
            records_read: 0,
            finished: false,
        })
    }

    /// The header of the log being read.
    pub fn header(&self) -> WaveHeader {
        self.header
    }

    /// How many records have been decoded so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    fn read_record(&mut self) -> Result<Option<WaveRecord>, WaveLogError> {
        let record_size = self.header.record_size();
        let n = read_chunk(&mut self.reader, record_size, &mut self.buf)
            .map_err(WaveLogError::IoError)?;

        if (n as u64) < record_size {
            if n > 0 {
                warn!(
                    "discarding {} trailing bytes, a record needs {}",
                    n, record_size
                );
            }
            return Ok(None);
        }

        let record = decode_record(&self.buf, self.header.station_count as usize)
            .map_err(WaveLogError::Malformed)?;
        self.records_read += 1;

        match self.skip {
            Some(0) => {}
            Some(skip) if skip < SEEK_THRESHOLD => {
                let skipped = io::copy(&mut self.reader.by_ref().take(skip as u64), &mut io::sink())
                    .map_err(WaveLogError::IoError)?;
                debug!("read through {} bytes", skipped);
            }
            Some(skip) => {
                let pos = self
                    .reader
                    .seek(SeekFrom::Current(skip))
                    .map_err(WaveLogError::IoError)?;
                debug!("skipped to byte {}", pos);
            }
            None => {
                warn!("stride jumps past any possible file offset, stopping after first record");
                self.finished = true;
            }
        }

        Ok(Some(record))
    }
}

impl<R: Read + Seek> Iterator for WaveLogReader<R> {
    type Item = Result<WaveRecord, WaveLogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes [WaveRecord]s in the wave log format.
#[derive(Debug)]
pub struct WaveLogWriter<W: Write> {
    writer: W,
    header: WaveHeader,
    buf: Vec<u8>,
}

impl WaveLogWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write the header.
    pub fn create(path: impl AsRef<Path>, station_count: u32) -> Result<Self, WaveLogError> {
        let handle = File::create(path).map_err(WaveLogError::IoError)?;
        Self::new(BufWriter::new(handle), station_count)
    }
}

impl<W: Write> WaveLogWriter<W> {
    /// Write the header for `station_count` stations to `writer`.
    pub fn new(mut writer: W, station_count: u32) -> Result<Self, WaveLogError> {
        writer
            .write_all(&station_count.to_le_bytes())
            .map_err(WaveLogError::IoError)?;
        let header = WaveHeader { station_count };
        Ok(WaveLogWriter {
            writer,
            header,
            buf: Vec::new(),
        })
    }

    /// Append one record. Its station count must match the header.
    pub fn write_record(&mut self, record: &WaveRecord) -> Result<(), WaveLogError> {
        if record.stations.len() != self.header.station_count as usize {
            return Err(WaveLogError::StationCountMismatch {
                expected: self.header.station_count,
                found: record.stations.len(),
            });
        }
        self.buf.clear();
        record.encode_into(&mut self.buf);
        self.writer
            .write_all(&self.buf)
            .map_err(WaveLogError::IoError)
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, WaveLogError> {
        self.writer.flush().map_err(WaveLogError::IoError)?;
        Ok(self.writer)
    }
}

/// A whole wave log in memory, one sequence per field. Every sequence has
/// one entry per decoded record.
///
/// The per-station sequences are only allocated once the first record
/// arrives, so a header claiming millions of stations costs nothing until
/// the file actually holds a record that big.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DecodedSeries {
    station_count: u32,
    timestamps: Vec<u64>,
    /// Empty until the first record, then one entry per station
    usage: Vec<Vec<u32>>,
    /// Empty until the first record, then one entry per station
    states: Vec<Vec<StationState>>,
}

impl DecodedSeries {
    /// An empty series for `station_count` stations.
    pub fn new(station_count: u32) -> Self {
        DecodedSeries {
            station_count,
            timestamps: Vec::new(),
            usage: Vec::new(),
            states: Vec::new(),
        }
    }

    /// Build a series from records that all hold `station_count` stations.
    pub fn from_records(
        station_count: u32,
        records: impl IntoIterator<Item = WaveRecord>,
    ) -> Result<Self, WaveLogError> {
        let mut series = Self::new(station_count);
        for record in records {
            series.push(record)?;
        }
        Ok(series)
    }

    /// Decode every `cfg.stride`th record from `reader`.
    pub fn from_reader<R: Read + Seek>(reader: R, cfg: &DecodeConfig) -> Result<Self, WaveLogError> {
        let records = WaveLogReader::with_config(reader, cfg)?;
        Self::collect_records(records)
    }

    /// Decode every `cfg.stride`th record from the wave log at `path`.
    pub fn from_path(path: impl AsRef<Path>, cfg: &DecodeConfig) -> Result<Self, WaveLogError> {
        let records = WaveLogReader::from_path(path, cfg)?;
        Self::collect_records(records)
    }

    fn collect_records<R: Read + Seek>(records: WaveLogReader<R>) -> Result<Self, WaveLogError> {
        let mut series = Self::new(records.header().station_count);
        for record in records {
            series.push(record?)?;
        }
        info!(
            "decoded {} samples from {} stations",
            series.len(),
            series.station_count
        );
        Ok(series)
    }

    /// Append one record to the end of every sequence.
    pub fn push(&mut self, record: WaveRecord) -> Result<(), WaveLogError> {
        let n = self.station_count as usize;
        if record.stations.len() != n {
            return Err(WaveLogError::StationCountMismatch {
                expected: self.station_count,
                found: record.stations.len(),
            });
        }
        if self.usage.len() != n {
            self.usage = vec![Vec::new(); n];
            self.states = vec![Vec::new(); n];
        }
        self.timestamps.push(record.timestamp);
        for (i, sample) in record.stations.into_iter().enumerate() {
            self.usage[i].push(sample.usage);
            self.states[i].push(sample.state);
        }
        Ok(())
    }

    /// Number of stations in the log.
    pub fn station_count(&self) -> u32 {
        self.station_count
    }

    /// Number of decoded records.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when no records were decoded.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps in microseconds.
    pub fn timestamps(&self) -> &[u64] {
        &self.timestamps
    }

    /// Usage sequences, one per station in index order.
    pub fn usage(&self) -> impl ExactSizeIterator<Item = &[u32]> + '_ {
        (0..self.station_count as usize)
            .map(move |i| self.usage.get(i).map_or(&[][..], |v| v.as_slice()))
    }

    /// State sequences, one per station in index order.
    pub fn states(&self) -> impl ExactSizeIterator<Item = &[StationState]> + '_ {
        (0..self.station_count as usize)
            .map(move |i| self.states.get(i).map_or(&[][..], |v| v.as_slice()))
    }

    /// Usage and state sequences of one station.
    pub fn station(&self, idx: usize) -> Option<(&[u32], &[StationState])> {
        if idx >= self.station_count as usize {
            return None;
        }
        let usage = self.usage.get(idx).map_or(&[][..], |v| v.as_slice());
        let states = self.states.get(idx).map_or(&[][..], |v| v.as_slice());
        Some((usage, states))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_decoder::StationSample;
    use std::io::Cursor;

    fn record(timestamp: u64, samples: &[(u32, u8)]) -> WaveRecord {
        WaveRecord {
            timestamp,
            stations: samples
                .iter()
                .map(|&(usage, code)| StationSample {
                    usage,
                    state: StationState::from(code),
                })
                .collect(),
        }
    }

    /// `count` records for `stations` stations. Record `k` has timestamp
    /// `k * 1000` and station `i` reports usage `k * 10 + i`.
    fn records(stations: u32, count: u64) -> Vec<WaveRecord> {
        (0..count)
            .map(|k| {
                let samples: Vec<(u32, u8)> = (0..stations)
                    .map(|i| ((k * 10) as u32 + i, (k % 4 + 1) as u8))
                    .collect();
                record(k * 1000, &samples)
            })
            .collect()
    }

    fn encode(stations: u32, recs: &[WaveRecord]) -> Vec<u8> {
        let mut writer = WaveLogWriter::new(Vec::new(), stations).unwrap();
        for r in recs {
            writer.write_record(r).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn empty_log_with_no_stations() {
        let bytes = 0u32.to_le_bytes().to_vec();
        let series = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default())
            .unwrap();

        assert_eq!(series.station_count(), 0);
        assert!(series.is_empty());
        assert!(series.timestamps().is_empty());
        assert_eq!(series.usage().len(), 0);
        assert_eq!(series.states().len(), 0);
    }

    #[test]
    fn stations_without_records() {
        let bytes = 3u32.to_le_bytes().to_vec();
        let series = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default())
            .unwrap();

        assert!(series.is_empty());
        assert_eq!(series.usage().len(), 3);
        assert!(series.usage().all(|u| u.is_empty()));
        assert!(series.states().all(|s| s.is_empty()));
        assert_eq!(series.station(2), Some((&[][..], &[][..])));
    }

    #[test]
    fn timestamp_only_records() {
        let recs = records(0, 3);
        let bytes = encode(0, &recs);
        assert_eq!(bytes.len(), 4 + 3 * 8);

        let series = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default())
            .unwrap();
        assert_eq!(series.timestamps(), &[0, 1000, 2000]);
        assert_eq!(series.usage().len(), 0);
    }

    #[test]
    fn reads_every_record_at_stride_one() {
        let recs = records(3, 7);
        let bytes = encode(3, &recs);

        let series = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default())
            .unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(
            series.timestamps(),
            &[0, 1000, 2000, 3000, 4000, 5000, 6000]
        );
        for i in 0..3 {
            let (usage, states) = series.station(i).unwrap();
            assert_eq!(usage.len(), 7);
            assert_eq!(states.len(), 7);
            for k in 0..7 {
                assert_eq!(usage[k], k as u32 * 10 + i as u32);
                assert_eq!(states[k], StationState::from((k % 4 + 1) as u8));
            }
        }
        assert!(series.station(3).is_none());
    }

    #[test]
    fn round_trip_exact_values() {
        let recs = vec![
            record(u64::MAX, &[(u32::MAX, 4), (0, 200)]),
            record(0, &[(1, 1), (2, 2)]),
            record(123_456_789, &[(77, 3), (88, 0)]),
        ];
        let bytes = encode(2, &recs);

        let decoded: Vec<WaveRecord> = WaveLogReader::new(Cursor::new(bytes), 1)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, recs);
    }

    #[test]
    fn stride_reads_every_nth_record() {
        let recs = records(2, 10);
        let bytes = encode(2, &recs);

        for stride in 1..=12 {
            let decoded: Vec<WaveRecord> = WaveLogReader::new(Cursor::new(bytes.clone()), stride)
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            let expected: Vec<WaveRecord> = recs.iter().step_by(stride).cloned().collect();

            assert_eq!(decoded.len(), (10 + stride - 1) / stride);
            assert_eq!(decoded, expected, "stride {}", stride);
        }
    }

    #[test]
    fn stride_past_end_of_file() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        let mut writer = WaveLogWriter::create(tempfile.path(), 1).unwrap();
        for r in records(1, 5) {
            writer.write_record(&r).unwrap();
        }
        writer.finish().unwrap();

        let series =
            DecodedSeries::from_path(tempfile.path(), &DecodeConfig::with_stride(100)).unwrap();
        assert_eq!(series.timestamps(), &[0]);
    }

    #[test]
    fn huge_stride_stops_after_first_record() {
        let bytes = encode(2, &records(2, 4));
        let decoded: Vec<WaveRecord> = WaveLogReader::new(Cursor::new(bytes), usize::MAX)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn truncated_header() {
        for len in 0..4 {
            let bytes = vec![1u8; len];
            let res = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default());
            assert!(matches!(res, Err(WaveLogError::TruncatedHeader)));
        }
    }

    #[test]
    fn truncated_header_on_disk() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tempfile.path(), [2u8, 0]).unwrap();

        let res = DecodedSeries::from_path(tempfile.path(), &DecodeConfig::default());
        assert!(matches!(res, Err(WaveLogError::TruncatedHeader)));
    }

    #[test]
    fn partial_last_record_is_dropped() {
        let recs = records(2, 4);
        let mut bytes = encode(2, &recs);
        let record_size = 8 + 2 * 5;
        bytes.truncate(bytes.len() - record_size + 5);

        let series = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default())
            .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.timestamps(), &[0, 1000, 2000]);
        assert!(series.usage().all(|u| u.len() == 3));
    }

    #[test]
    fn zero_stride_is_an_input_error() {
        let bytes = encode(1, &records(1, 2));
        assert!(matches!(
            WaveLogReader::new(Cursor::new(bytes), 0),
            Err(WaveLogError::InvalidStride(0))
        ));
        // rejected before the header is even looked at
        assert!(matches!(
            WaveLogReader::new(Cursor::new(Vec::new()), 0),
            Err(WaveLogError::InvalidStride(0))
        ));
    }

    #[test]
    fn station_limit_rejects_header() {
        let bytes = encode(8, &records(8, 1));
        let cfg = DecodeConfig {
            stride: 1,
            max_stations: Some(4),
        };
        assert!(matches!(
            DecodedSeries::from_reader(Cursor::new(bytes), &cfg),
            Err(WaveLogError::TooManyStations { found: 8, limit: 4 })
        ));
    }

    #[test]
    fn absurd_station_count_reads_nothing() {
        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xAB; 64]);

        let mut reader = WaveLogReader::new(Cursor::new(bytes), 1).unwrap();
        assert_eq!(reader.header().station_count, u32::MAX);
        assert!(reader.next().is_none());
        assert_eq!(reader.records_read(), 0);
    }

    #[test]
    fn absurd_station_count_series_is_empty() {
        let mut bytes = 200_000_000u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xCD; 64]);

        let series = DecodedSeries::from_reader(Cursor::new(bytes), &DecodeConfig::default())
            .unwrap();
        assert_eq!(series.station_count(), 200_000_000);
        assert!(series.is_empty());
        assert_eq!(series.usage().len(), 200_000_000);
        assert_eq!(series.station(199_999_999), Some((&[][..], &[][..])));
        assert!(series.station(200_000_000).is_none());
    }

    /// Counts the seeks issued against a log held in memory.
    struct SeekCounter {
        inner: Cursor<Vec<u8>>,
        seeks: usize,
    }

    impl Read for SeekCounter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Seek for SeekCounter {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.seeks += 1;
            self.inner.seek(pos)
        }
    }

    #[test]
    fn short_skips_are_read_through() {
        let recs = records(2, 10);
        let mut counter = SeekCounter {
            inner: Cursor::new(encode(2, &recs)),
            seeks: 0,
        };

        let decoded: Vec<WaveRecord> = WaveLogReader::new(&mut counter, 3)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let expected: Vec<WaveRecord> = recs.iter().step_by(3).cloned().collect();
        assert_eq!(decoded, expected);
        assert_eq!(counter.seeks, 0);
    }

    #[test]
    fn long_skips_are_seeked_over() {
        // 8 byte records, a stride of 10000 skips 79992 bytes at a time
        let recs = records(0, 25_000);
        let mut counter = SeekCounter {
            inner: Cursor::new(encode(0, &recs)),
            seeks: 0,
        };

        let series = DecodedSeries::from_reader(&mut counter, &DecodeConfig::with_stride(10_000))
            .unwrap();
        assert_eq!(series.timestamps(), &[0, 10_000_000, 20_000_000]);
        assert_eq!(counter.seeks, 3);
    }

    #[test]
    fn writer_rejects_wrong_station_count() {
        let mut writer = WaveLogWriter::new(Vec::new(), 2).unwrap();
        let res = writer.write_record(&record(0, &[(1, 1)]));
        assert!(matches!(
            res,
            Err(WaveLogError::StationCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        // nothing past the header was written
        assert_eq!(writer.finish().unwrap().len(), 4);
    }

    #[test]
    fn series_rejects_wrong_station_count() {
        let res = DecodedSeries::from_records(3, records(2, 1));
        assert!(matches!(
            res,
            Err(WaveLogError::StationCountMismatch {
                expected: 3,
                found: 2
            })
        ));
    }
}
