//! Byte-level parsers for the pieces of a wave log: the station-count header
//! and the fixed-size sample records that follow it. Everything is
//! little-endian.

use nom::{
    combinator::map,
    multi::count,
    number::complete::{le_u32, le_u64, le_u8},
    sequence::tuple,
    Finish, IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Size of the timestamp that opens every record.
pub const TIMESTAMP_SIZE: u64 = 8;

/// Size of one station's reading (usage + state) within a record.
pub const STATION_SIZE: u64 = 5;

/// The power state a station reported for a sample.
///
/// Codes outside 1..=4 are kept as [StationState::Unknown] so that logs from
/// newer writers still decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum StationState {
    /// Code 1
    Sleep,
    /// Code 2
    PowerDown,
    /// Code 3
    PowerUp,
    /// Code 4
    Active,
    /// Any other code, passed through as-is
    Unknown(u8),
}

impl StationState {
    /// The raw byte this state is stored as.
    pub fn code(self) -> u8 {
        match self {
            StationState::Sleep => 1,
            StationState::PowerDown => 2,
            StationState::PowerUp => 3,
            StationState::Active => 4,
            StationState::Unknown(code) => code,
        }
    }
}

impl From<u8> for StationState {
    fn from(code: u8) -> Self {
        match code {
            1 => StationState::Sleep,
            2 => StationState::PowerDown,
            3 => StationState::PowerUp,
            4 => StationState::Active,
            other => StationState::Unknown(other),
        }
    }
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StationState::Sleep => write!(f, "Sleep"),
            StationState::PowerDown => write!(f, "PowerDown"),
            StationState::PowerUp => write!(f, "PowerUp"),
            StationState::Active => write!(f, "Active"),
            StationState::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// The header at the start of every wave log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveHeader {
    /// How many stations report in each record
    pub station_count: u32,
}

impl WaveHeader {
    /// Size of a single record in bytes. Computed in 64 bits, a corrupt
    /// station count gives a huge record size rather than an overflow.
    pub fn record_size(&self) -> u64 {
        TIMESTAMP_SIZE + self.station_count as u64 * STATION_SIZE
    }
}

/// One station's reading within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationSample {
    /// Resource usage
    pub usage: u32,
    /// Power state
    pub state: StationState,
}

/// One timestamp and the readings of all stations at that time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveRecord {
    /// Microseconds
    pub timestamp: u64,
    /// Readings in station index order
    pub stations: Vec<StationSample>,
}

impl WaveRecord {
    /// Appends the on-disk representation of this record to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        for station in &self.stations {
            buf.extend_from_slice(&station.usage.to_le_bytes());
            buf.push(station.state.code());
        }
    }
}

fn parse_header(s: &[u8]) -> IResult<&[u8], WaveHeader> {
    map(le_u32, |station_count| WaveHeader { station_count })(s)
}

fn parse_station(s: &[u8]) -> IResult<&[u8], StationSample> {
    map(tuple((le_u32, le_u8)), |(usage, code)| StationSample {
        usage,
        state: StationState::from(code),
    })(s)
}

fn parse_record(s: &[u8], station_count: usize) -> IResult<&[u8], WaveRecord> {
    map(
        tuple((le_u64, count(parse_station, station_count))),
        |(timestamp, stations)| WaveRecord {
            timestamp,
            stations,
        },
    )(s)
}

/// Decodes a header from the start of `buf`. Returns `None` if there are
/// fewer than [HEADER_SIZE] bytes.
pub fn decode_header(buf: &[u8]) -> Option<WaveHeader> {
    parse_header(buf).finish().ok().map(|(_rest, header)| header)
}

/// Decodes one record holding `station_count` stations from the start of
/// `buf`.
pub fn decode_record(
    buf: &[u8],
    station_count: usize,
) -> Result<WaveRecord, nom::error::ErrorKind> {
    parse_record(buf, station_count)
        .finish()
        .map(|(_rest, record)| record)
        .map_err(|e| e.code)
}
