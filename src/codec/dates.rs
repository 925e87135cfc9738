use chrono::NaiveDate;

use crate::error::{FetchError, Result};

const DAYS_PER_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS_PER_MONTH[(month - 1) as usize]
    }
}

/// Gregorian day of year, 1-based.
///
/// # Examples
/// ```
/// use highrate_fetch::codec::day_of_year;
///
/// assert_eq!(day_of_year(2024, 3, 1).unwrap(), 61);
/// assert_eq!(day_of_year(2023, 3, 1).unwrap(), 60);
/// ```
pub fn day_of_year(year: i32, month: u32, day: u32) -> Result<u32> {
    if !(1..=12).contains(&month) {
        return Err(FetchError::FatalInput(format!(
            "Month {} is out of range 1-12",
            month
        )));
    }

    if day == 0 || day > days_in_month(year, month) {
        return Err(FetchError::FatalInput(format!(
            "Day {} is out of range for {}-{:02}",
            day, year, month
        )));
    }

    let preceding: u32 = (1..month).map(|m| days_in_month(year, m)).sum();
    Ok(preceding + day)
}

/// Start of GPS time, 1980-01-06.
pub fn gps_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 1, 6).unwrap_or_default()
}

/// Whole weeks elapsed since the GPS epoch (floor division).
pub fn gps_week(date: NaiveDate) -> i64 {
    (date - gps_epoch()).num_days().div_euclid(7)
}

/// Age in days of `date` relative to `today`; negative for future dates.
pub fn age_in_days(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days()
}

/// The archive only keeps high-rate data for a limited period.
pub fn check_retention(date: NaiveDate, today: NaiveDate, max_age_days: i64) -> Result<()> {
    let age = age_in_days(date, today);
    if age > max_age_days {
        return Err(FetchError::FatalInput(format!(
            "Only dates up to {} days old are retained; {} is {} days old",
            max_age_days, date, age
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2000));
    }

    #[test]
    fn test_day_of_year_examples() {
        assert_eq!(day_of_year(2024, 3, 1).unwrap(), 61);
        assert_eq!(day_of_year(2023, 3, 1).unwrap(), 60);
        assert_eq!(day_of_year(2023, 1, 1).unwrap(), 1);
        assert_eq!(day_of_year(2024, 12, 31).unwrap(), 366);
    }

    #[test]
    fn test_day_of_year_matches_calendar() {
        let mut date = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2005, 1, 1).unwrap();
        while date < end {
            assert_eq!(
                day_of_year(date.year(), date.month(), date.day()).unwrap(),
                date.ordinal()
            );
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_invalid_dates_rejected() {
        assert!(day_of_year(2023, 2, 29).is_err());
        assert!(day_of_year(2023, 13, 1).is_err());
        assert!(day_of_year(2023, 4, 31).is_err());
        assert!(day_of_year(2023, 0, 1).is_err());
    }

    #[test]
    fn test_gps_week() {
        assert_eq!(gps_week(NaiveDate::from_ymd_opt(1980, 1, 6).unwrap()), 0);
        assert_eq!(gps_week(NaiveDate::from_ymd_opt(1980, 1, 12).unwrap()), 0);
        assert_eq!(gps_week(NaiveDate::from_ymd_opt(1980, 1, 13).unwrap()), 1);
        assert_eq!(gps_week(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()), 2361);
    }

    #[test]
    fn test_retention_rule() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let recent = today - chrono::Duration::days(182);
        let old = today - chrono::Duration::days(183);
        assert!(check_retention(recent, today, 182).is_ok());
        assert!(check_retention(old, today, 182).is_err());
    }
}
