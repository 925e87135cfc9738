use chrono::{Datelike, Local};
use std::path::PathBuf;

use crate::models::{StationRequest, TimeWindow};

/// `{STATION}_{YYYYDOY}_{HH}-{HH}.zip`, e.g. `ABMF00GLP_2025100_00-03.zip`.
pub fn station_archive_name(request: &StationRequest, window: &TimeWindow) -> String {
    format!(
        "{}_{}{:03}_{:02}-{:02}.zip",
        request.long_code(),
        window.year,
        window.day_of_year,
        window.start_hour,
        window.end_hour
    )
}

/// Combined archive for several stations: `highrate_{YYYYDOY}_{HH}-{HH}.zip`.
pub fn combined_archive_name(window: &TimeWindow) -> String {
    format!(
        "highrate_{}{:03}_{:02}-{:02}.zip",
        window.year, window.day_of_year, window.start_hour, window.end_hour
    )
}

/// Default destination when the CLI is given no `--output`.
pub fn default_output_path(file_name: &str) -> PathBuf {
    PathBuf::from("output").join(file_name)
}

/// Directory for downloaded orbit products: `output/orbits-{YYMMDD}`.
pub fn default_products_dir() -> PathBuf {
    dated_output_dir("orbits")
}

/// Directory for NOAA CORS downloads: `output/cors-{YYMMDD}`.
pub fn default_cors_dir() -> PathBuf {
    dated_output_dir("cors")
}

fn dated_output_dir(prefix: &str) -> PathBuf {
    let now = Local::now();
    PathBuf::from("output").join(format!(
        "{}-{:02}{:02}{:02}",
        prefix,
        now.year() % 100,
        now.month(),
        now.day()
    ))
}
