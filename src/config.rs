//! Decoder settings. They can come from the command line or from a RON file
//! such as:
//!
//! ```text
//! (stride: 100, max_stations: Some(64))
//! ```
//!
//! Missing fields take their default values.

use crate::error::WaveLogError;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

/// How a wave log should be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Read every `stride`th record, 1 reads them all
    pub stride: usize,

    /// Refuse headers that declare more stations than this. Unset means the
    /// station count is trusted.
    pub max_stations: Option<u32>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            stride: 1,
            max_stations: None,
        }
    }
}

impl DecodeConfig {
    /// Default settings with the given stride.
    pub fn with_stride(stride: usize) -> Self {
        Self {
            stride,
            ..Self::default()
        }
    }

    /// Read settings from a RON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WaveLogError> {
        let file = File::open(path).map_err(WaveLogError::IoError)?;
        ron::de::from_reader(file).map_err(WaveLogError::RonSpannedError)
    }

    /// Reject settings the decoder can't work with.
    pub fn validate(self) -> Result<Self, WaveLogError> {
        if self.stride < 1 {
            return Err(WaveLogError::InvalidStride(self.stride));
        }
        Ok(self)
    }

    /// Check a header's station count against `max_stations`.
    pub fn check_station_count(&self, station_count: u32) -> Result<(), WaveLogError> {
        match self.max_stations {
            Some(limit) if station_count > limit => Err(WaveLogError::TooManyStations {
                found: station_count,
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Write the default settings to `path` as pretty RON.
    pub fn save_default(path: impl AsRef<Path>) -> Result<(), WaveLogError> {
        let cfg_str = ron::ser::to_string_pretty(&Self::default(), PrettyConfig::default())
            .map_err(WaveLogError::RonError)?;
        std::fs::write(path, cfg_str).map_err(WaveLogError::IoError)
    }
}
