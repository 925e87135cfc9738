use std::path::Path;

use crate::error::{FetchError, Result};
use crate::models::{DataType, RinexVersion, Slot, StationRequest};
use crate::utils::constants::{
    FRAGMENT_DURATION_TOKEN, HIGHRATE_PATH, MD5SUMS_FILE, PRODUCTS_PATH, RINEX3_OBS_SUFFIX,
    SUMMARY_PREFIX,
};

/// File-naming convention of one archive era.
pub trait NamingStrategy: Send + Sync {
    /// Compressed archive file name for one slot.
    fn file_name(&self, request: &StationRequest, year: i32, doy: u32, slot: Slot) -> String;

    /// Name the converter writes for a compact (already decompressed) file.
    fn converted_name(&self, compact_name: &str) -> Result<String>;
}

/// `{STATION}_{TYPE}_{YYYY}{DOY}{HH}{MM}_15M_01S_MO.crx.gz`
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentNaming;

/// `{ssss}{DOY}{h}{MM}.{YY}d.gz` with `h` = 'a' + hour
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyNaming;

impl NamingStrategy for CurrentNaming {
    fn file_name(&self, request: &StationRequest, year: i32, doy: u32, slot: Slot) -> String {
        format!(
            "{}_{}_{:04}{:03}{:02}{:02}_{}_01S_MO.crx.gz",
            request.long_code(),
            request.data_type.as_char(),
            year,
            doy,
            slot.hour,
            slot.minute,
            FRAGMENT_DURATION_TOKEN
        )
    }

    fn converted_name(&self, compact_name: &str) -> Result<String> {
        let stem = file_stem(compact_name)?;
        Ok(format!("{}.{}", stem, RINEX3_OBS_SUFFIX))
    }
}

impl NamingStrategy for LegacyNaming {
    fn file_name(&self, request: &StationRequest, year: i32, doy: u32, slot: Slot) -> String {
        format!(
            "{}{:03}{}{:02}.{:02}d.gz",
            request.short_code(),
            doy,
            hour_letter(slot.hour),
            slot.minute,
            year.rem_euclid(100)
        )
    }

    fn converted_name(&self, compact_name: &str) -> Result<String> {
        // "mad2156a30.25d" -> "25"
        let yy = compact_name
            .len()
            .checked_sub(3)
            .and_then(|start| compact_name.get(start..compact_name.len() - 1))
            .filter(|yy| yy.chars().all(|c| c.is_ascii_digit()) && compact_name.ends_with('d'))
            .ok_or_else(|| {
                FetchError::InvalidFormat(format!(
                    "Cannot read the two-digit year from compact name '{}'",
                    compact_name
                ))
            })?;
        let stem = file_stem(compact_name)?;
        Ok(format!("{}.{}o", stem, yy))
    }
}

static CURRENT: CurrentNaming = CurrentNaming;
static LEGACY: LegacyNaming = LegacyNaming;

/// Pick the convention once per request.
pub fn strategy_for(version: RinexVersion) -> &'static dyn NamingStrategy {
    match version {
        RinexVersion::V3 => &CURRENT,
        RinexVersion::V2 => &LEGACY,
    }
}

/// Legacy hour code: 0 -> 'a' ... 23 -> 'x'. Callers validate the hour first.
pub fn hour_letter(hour: u32) -> char {
    (b'a' + hour as u8) as char
}

/// Build an archive file name, rejecting hours beyond 23 and non-quarter minutes.
pub fn build_file_name(
    station: &str,
    year: i32,
    doy: u32,
    hour: u32,
    minute: u32,
    version: RinexVersion,
    data_type: DataType,
) -> Result<String> {
    let slot = Slot::new(hour, minute)?;
    let request = StationRequest::new(station, version, data_type)?;
    Ok(strategy_for(version).file_name(&request, year, doy, slot))
}

/// `{base}/archive/gnss/data/highrate/{year}/{doy}/{yy}d/{HH}/{file}`
pub fn highrate_url(base: &str, year: i32, doy: u32, hour: u32, file_name: &str) -> String {
    format!(
        "{}/{}/{:04}/{:03}/{:02}d/{:02}/{}",
        base.trim_end_matches('/'),
        HIGHRATE_PATH,
        year,
        doy,
        year.rem_euclid(100),
        hour,
        file_name
    )
}

/// `{base}/archive/gnss/products/{week}/{file}`
pub fn product_url(base: &str, gps_week: i64, file_name: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        base.trim_end_matches('/'),
        PRODUCTS_PATH,
        gps_week,
        file_name
    )
}

/// Checksum listing naming every product published for `gps_week`.
pub fn md5sums_url(base: &str, gps_week: i64) -> String {
    product_url(base, gps_week, MD5SUMS_FILE)
}

/// Availability summary for `year`; the running year is published as `.current`.
pub fn summary_url(base: &str, year: i32, current_year: i32) -> String {
    let suffix = if year == current_year {
        "current".to_string()
    } else {
        year.to_string()
    };
    format!(
        "{}/{}/reports/{}.{}",
        base.trim_end_matches('/'),
        HIGHRATE_PATH,
        SUMMARY_PREFIX,
        suffix
    )
}

/// File name without its last extension.
fn file_stem(name: &str) -> Result<String> {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| FetchError::InvalidFormat(format!("No file stem in '{}'", name)))
}
