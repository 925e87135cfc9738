use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::{FetchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RinexVersion {
    V2,
    V3,
}

impl RinexVersion {
    pub fn tag(&self) -> &'static str {
        match self {
            RinexVersion::V2 => "2",
            RinexVersion::V3 => "3",
        }
    }
}

impl FromStr for RinexVersion {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        // summary files and users write "3", "3.04", "v3" and so on
        match s.trim().trim_start_matches(['v', 'V']).chars().next() {
            Some('2') => Ok(RinexVersion::V2),
            Some('3') | Some('4') => Ok(RinexVersion::V3),
            _ => Err(FetchError::FatalInput(format!(
                "Unsupported RINEX version '{}'. Expected 2 or 3",
                s
            ))),
        }
    }
}

impl fmt::Display for RinexVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Data source flag carried in current-era file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Stream-sourced (real-time) data
    S,
    /// Receiver-sourced data
    R,
}

impl DataType {
    pub fn as_char(&self) -> char {
        match self {
            DataType::S => 'S',
            DataType::R => 'R',
        }
    }
}

impl FromStr for DataType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "S" | "s" => Ok(DataType::S),
            "R" | "r" => Ok(DataType::R),
            other => Err(FetchError::FatalInput(format!(
                "Unknown data type '{}'. Expected S or R",
                other
            ))),
        }
    }
}

/// One station's acquisition parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationRequest {
    #[validate(length(min = 4, max = 9))]
    pub station: String,
    pub version: RinexVersion,
    pub data_type: DataType,
}

impl StationRequest {
    pub fn new(station: &str, version: RinexVersion, data_type: DataType) -> Result<Self> {
        let station = station.trim().to_string();
        if !station.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FetchError::FatalInput(format!(
                "Station code '{}' must be alphanumeric",
                station
            )));
        }

        let request = Self {
            station,
            version,
            // legacy names carry no type token
            data_type: match version {
                RinexVersion::V3 => data_type,
                RinexVersion::V2 => DataType::R,
            },
        };
        request.validate()?;
        Ok(request)
    }

    /// First four characters, lower-cased, as used in legacy file names.
    pub fn short_code(&self) -> String {
        self.station.chars().take(4).collect::<String>().to_lowercase()
    }

    /// Full station identifier upper-cased, as used in current file names.
    pub fn long_code(&self) -> String {
        self.station.to_uppercase()
    }
}

/// Row of the local station table.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationRecord {
    #[validate(length(min = 4, max = 9))]
    pub site: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub one_second: bool,

    pub data_type: DataType,
}

impl StationRecord {
    pub fn short_code(&self) -> String {
        self.site.chars().take(4).collect::<String>().to_uppercase()
    }
}
