use crate::error::{FetchError, Result};
use crate::models::{DataType, RinexVersion, StationRecord};
use crate::utils::coordinates::{haversine_distance, validate_coordinates};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

/// Raw CSV row. Headers are matched case-insensitively; the NOAA CORS
/// network export (`SITEID`, `x`/`y`) is accepted too.
#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "site name", alias = "siteid")]
    site: String,
    #[serde(default)]
    latitude: Option<String>,
    #[serde(default)]
    longitude: Option<String>,
    /// Longitude in the NOAA export; preferred when present.
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
    #[serde(rename = "rate 1s", default)]
    rate_1s: Option<String>,
}

/// Station plus its distance from a query point.
#[derive(Debug, Clone, Serialize)]
pub struct NearestStation {
    pub station: StationRecord,
    pub distance_km: f64,
}

pub struct StationReader {
    type_s: HashSet<String>,
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StationReader {
    pub fn new() -> Self {
        Self {
            type_s: HashSet::new(),
        }
    }

    pub fn with_type_s(type_s: HashSet<String>) -> Self {
        Self { type_s }
    }

    /// Stations publishing type `S` files, one code per line. A missing
    /// file yields an empty set.
    pub fn read_type_s_list(path: &Path) -> Result<HashSet<String>> {
        if !path.exists() {
            warn!(path = %path.display(), "type S station list not found");
            return Ok(HashSet::new());
        }

        Ok(fs::read_to_string(path)?
            .lines()
            .map(|line| line.split(',').next().unwrap_or_default().trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect())
    }

    pub fn read_stations(&self, path: &Path) -> Result<StationTable> {
        let file = fs::File::open(path)?;
        self.read_stations_from(file)
    }

    pub fn read_stations_from<R: Read>(&self, source: R) -> Result<StationTable> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

        let headers: StringRecord = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        reader.set_headers(headers);

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<StationRow>().enumerate() {
            let row = row?;
            match self.parse_row(&row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(line = line + 2, site = %row.site, error = %e, "skipping station row"),
            }
        }

        debug!(stations = records.len(), "station table loaded");
        Ok(StationTable {
            records,
            type_s: self.type_s.clone(),
        })
    }

    fn parse_row(&self, row: &StationRow) -> Result<StationRecord> {
        let latitude = parse_decimal(coordinate(&row.y, &row.latitude, "latitude")?)?;
        let longitude = parse_decimal(coordinate(&row.x, &row.longitude, "longitude")?)?;
        let site = row.site.trim().to_string();

        let record = StationRecord {
            data_type: if self.is_type_s(&site) {
                DataType::S
            } else {
                DataType::R
            },
            one_second: row
                .rate_1s
                .as_deref()
                .map(is_affirmative)
                .unwrap_or(false),
            site,
            latitude,
            longitude,
        };
        record.validate()?;
        Ok(record)
    }

    fn is_type_s(&self, site: &str) -> bool {
        is_listed(&self.type_s, site)
    }
}

/// In-memory station table. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    records: Vec<StationRecord>,
    type_s: HashSet<String>,
}

impl StationTable {
    pub fn new(records: Vec<StationRecord>) -> Self {
        Self {
            records,
            type_s: HashSet::new(),
        }
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First row whose site name starts with the four-character code of `site`.
    pub fn find(&self, site: &str) -> Option<&StationRecord> {
        let code = site.chars().take(4).collect::<String>().to_uppercase();
        self.records
            .iter()
            .find(|r| r.site.to_uppercase().starts_with(&code))
    }

    /// `S` only for current-era names of listed stations.
    pub fn data_type_for(&self, site: &str, version: RinexVersion) -> DataType {
        if version != RinexVersion::V3 {
            return DataType::R;
        }

        let listed = is_listed(&self.type_s, site)
            || self.find(site).map(|r| r.data_type) == Some(DataType::S);
        if listed {
            DataType::S
        } else {
            DataType::R
        }
    }

    /// The `count` stations closest to the given position, nearest first.
    pub fn nearest(&self, latitude: f64, longitude: f64, count: usize) -> Result<Vec<NearestStation>> {
        validate_coordinates(latitude, longitude)?;

        let mut ranked: Vec<NearestStation> = self
            .records
            .iter()
            .map(|station| NearestStation {
                distance_km: haversine_distance(
                    latitude,
                    longitude,
                    station.latitude,
                    station.longitude,
                ),
                station: station.clone(),
            })
            .collect();

        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked.truncate(count);
        Ok(ranked)
    }
}

fn is_listed(list: &HashSet<String>, site: &str) -> bool {
    let full = site.trim().to_uppercase();
    let short: String = full.chars().take(4).collect();
    list.contains(&full) || list.contains(&short)
}

fn is_affirmative(value: &str) -> bool {
    matches!(
        value.trim().to_uppercase().as_str(),
        "SI" | "SÍ" | "YES" | "Y" | "TRUE" | "1"
    )
}

/// Decimal number, tolerating a comma as the decimal separator.
fn coordinate<'a>(
    preferred: &'a Option<String>,
    fallback: &'a Option<String>,
    name: &str,
) -> Result<&'a str> {
    [preferred, fallback]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .find(|v| !v.trim().is_empty())
        .ok_or_else(|| FetchError::InvalidFormat(format!("Missing {}", name)))
}

fn parse_decimal(value: &str) -> Result<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| FetchError::InvalidFormat(format!("Invalid coordinate value: '{}'", value)))
}
