use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::codec::summary_url;
use crate::error::Result;
use crate::models::RinexVersion;
use crate::readers::StationTable;
use crate::transport::AuthSession;
use crate::utils::coordinates::normalize_longitude;

const HEADER_ROWS: usize = 5;
const SITE: (usize, usize) = (2, 6);
const VERSION: (usize, usize) = (8, 9);
const DESCRIPTION: (usize, usize) = (11, 29);
const LATITUDE: (usize, usize) = (31, 38);
const LONGITUDE: (usize, usize) = (40, 48);
const START: (usize, usize) = (50, 61);
const START_DOY: (usize, usize) = (63, 68);
const END: (usize, usize) = (70, 81);
const END_DOY: (usize, usize) = (83, 88);
const DATE_FORMAT: &str = "%d-%b-%y";

/// One site's line of the high-rate availability summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub site: String,
    pub version: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start: NaiveDate,
    pub start_doy: Option<u32>,
    pub end: NaiveDate,
    pub end_doy: Option<u32>,
}

impl SummaryEntry {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Parsed summary keyed by the upper-cased four-character site code.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    entries: HashMap<String, SummaryEntry>,
}

impl Summary {
    /// Rows without both dates are dropped; a later row for the same site
    /// replaces an earlier one.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();

        for line in text.lines().skip(HEADER_ROWS) {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(entry) = parse_line(line) {
                entries.insert(entry.site.clone(), entry);
            }
        }

        debug!(sites = entries.len(), "summary parsed");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, site: &str) -> Option<&SummaryEntry> {
        self.entries.get(&site_key(site))
    }

    pub fn rinex_version_for(&self, site: &str) -> Option<RinexVersion> {
        self.get(site).and_then(|e| e.version.parse().ok())
    }
}

/// Result of checking whether one-second data exists for a site and date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Availability {
    Available { version: String },
    NotInStationTable,
    NoOneSecondRate,
    NotInSummary,
    OutOfRange { start: NaiveDate, end: NaiveDate },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available { .. })
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available { version } => {
                write!(f, "1-second data available, RINEX v{}", version)
            }
            Availability::NotInStationTable => write!(f, "station is not in the local station table"),
            Availability::NoOneSecondRate => {
                write!(f, "station has no 1-second rate according to the station table")
            }
            Availability::NotInSummary => {
                write!(f, "station is not listed in the summary for that year")
            }
            Availability::OutOfRange { start, end } => {
                write!(f, "date is outside the published range ({} to {})", start, end)
            }
        }
    }
}

/// Station table first, then the summary listing and its date range.
pub fn check_availability(
    site: &str,
    date: NaiveDate,
    summary: &Summary,
    table: &StationTable,
) -> Availability {
    let Some(record) = table.find(site) else {
        return Availability::NotInStationTable;
    };
    if !record.one_second {
        return Availability::NoOneSecondRate;
    }

    let Some(entry) = summary.get(site) else {
        return Availability::NotInSummary;
    };
    if !entry.covers(date) {
        return Availability::OutOfRange {
            start: entry.start,
            end: entry.end,
        };
    }

    Availability::Available {
        version: entry.version.clone(),
    }
}

/// Download and parse the summary for `year`.
pub async fn download_summary(
    session: &AuthSession,
    archive_base: &str,
    year: i32,
    current_year: i32,
) -> Result<Summary> {
    let url = summary_url(archive_base, year, current_year);
    info!(url = %url, "downloading availability summary");
    let text = session.get_text(&url).await?;
    Ok(Summary::parse(&text))
}

fn site_key(site: &str) -> String {
    site.trim().chars().take(4).collect::<String>().to_uppercase()
}

fn column(line: &str, (start, end): (usize, usize)) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

fn parse_line(line: &str) -> Option<SummaryEntry> {
    let site = site_key(column(line, SITE));
    if site.is_empty() {
        return None;
    }

    let start = NaiveDate::parse_from_str(column(line, START), DATE_FORMAT).ok()?;
    let end = NaiveDate::parse_from_str(column(line, END), DATE_FORMAT).ok()?;

    Some(SummaryEntry {
        site,
        version: column(line, VERSION).to_string(),
        description: column(line, DESCRIPTION).to_string(),
        latitude: column(line, LATITUDE).parse().ok(),
        longitude: column(line, LONGITUDE)
            .parse()
            .ok()
            .map(normalize_longitude),
        start,
        start_doy: column(line, START_DOY).parse().ok(),
        end,
        end_doy: column(line, END_DOY).parse().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, StationRecord};
    use pretty_assertions::assert_eq;

    fn place(line: &mut Vec<u8>, (start, _): (usize, usize), value: &str) {
        if line.len() < start + value.len() {
            line.resize(start + value.len(), b' ');
        }
        line[start..start + value.len()].copy_from_slice(value.as_bytes());
    }

    fn row(site: &str, version: &str, start: &str, end: &str) -> String {
        let mut line = vec![b' '; 90];
        place(&mut line, SITE, site);
        place(&mut line, VERSION, version);
        place(&mut line, DESCRIPTION, "Les Abymes");
        place(&mut line, LATITUDE, "16.262");
        place(&mut line, LONGITUDE, "298.473");
        place(&mut line, START, start);
        place(&mut line, START_DOY, "24001");
        place(&mut line, END, end);
        place(&mut line, END_DOY, "24366");
        String::from_utf8(line).unwrap()
    }

    fn summary_text() -> String {
        let mut text = String::from("header 1\nheader 2\nheader 3\nheader 4\nheader 5\n");
        text.push_str(&row("abmf", "3", "01-Jan-24", "31-Dec-24"));
        text.push('\n');
        text.push_str(&row("mad2", "2", "15-Mar-24", "30-Jun-24"));
        text.push('\n');
        text.push_str(&row("bad1", "3", "unknown", "31-Dec-24"));
        text.push_str("\n\n");
        text
    }

    fn table() -> StationTable {
        let record = |site: &str, one_second: bool| StationRecord {
            site: site.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            one_second,
            data_type: DataType::R,
        };
        StationTable::new(vec![
            record("ABMF00GLP", true),
            record("MAD200ESP", true),
            record("SLOW00XXX", false),
        ])
    }

    #[test]
    fn test_parse_fixed_width_rows() {
        let summary = Summary::parse(&summary_text());
        assert_eq!(summary.len(), 2);

        let abmf = summary.get("ABMF00GLP").unwrap();
        assert_eq!(abmf.site, "ABMF");
        assert_eq!(abmf.version, "3");
        assert_eq!(abmf.description, "Les Abymes");
        assert_eq!(abmf.start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(abmf.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(abmf.latitude, Some(16.262));
        assert!((abmf.longitude.unwrap() - -61.527).abs() < 1e-9);
        assert_eq!(abmf.start_doy, Some(24001));
        assert_eq!(abmf.end_doy, Some(24366));

        assert!(summary.get("BAD1").is_none());
        assert_eq!(summary.rinex_version_for("mad2"), Some(RinexVersion::V2));
    }

    #[test]
    fn test_availability_checks_in_order() {
        let summary = Summary::parse(&summary_text());
        let table = table();
        let date = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();

        assert_eq!(
            check_availability("ABMF00GLP", date, &summary, &table),
            Availability::Available {
                version: "3".to_string()
            }
        );
        assert_eq!(
            check_availability("ZZZZ00ZZZ", date, &summary, &table),
            Availability::NotInStationTable
        );
        assert_eq!(
            check_availability("SLOW00XXX", date, &summary, &table),
            Availability::NoOneSecondRate
        );

        let late = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
        let outcome = check_availability("MAD200ESP", late, &summary, &table);
        assert!(!outcome.is_available());
        assert!(matches!(outcome, Availability::OutOfRange { .. }));
    }

    #[test]
    fn test_range_is_inclusive() {
        let summary = Summary::parse(&summary_text());
        let entry = summary.get("MAD2").unwrap();
        assert!(entry.covers(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
        assert!(entry.covers(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()));
        assert!(!entry.covers(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()));
    }

    #[test]
    fn test_short_lines_are_ignored() {
        let text = "a\nb\nc\nd\ne\n  ABMF 3\n";
        assert!(Summary::parse(text).is_empty());
    }
}
