use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::dates::{day_of_year, days_in_year};
use crate::error::{FetchError, Result};
use crate::utils::constants::{HOURS_PER_DAY, QUARTER_MINUTES};

/// A 15-minute publication slot within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub hour: u32,
    pub minute: u32,
}

impl Slot {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour >= HOURS_PER_DAY {
            return Err(FetchError::FatalInput(format!(
                "Hour {} is out of range 0-23",
                hour
            )));
        }
        if !QUARTER_MINUTES.contains(&minute) {
            return Err(FetchError::FatalInput(format!(
                "Minute {} is not a quarter-hour slot",
                minute
            )));
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Hours `[start_hour, end_hour)` of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub year: i32,
    pub day_of_year: u32,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl TimeWindow {
    pub fn new(year: i32, day_of_year: u32, start_hour: u32, end_hour: u32) -> Result<Self> {
        if day_of_year == 0 || day_of_year > days_in_year(year) {
            return Err(FetchError::FatalInput(format!(
                "Day of year {} is out of range for {}",
                day_of_year, year
            )));
        }

        if start_hour >= end_hour || end_hour > HOURS_PER_DAY {
            return Err(FetchError::FatalInput(format!(
                "Invalid hour range [{}, {}): expected 0 <= start < end <= 24",
                start_hour, end_hour
            )));
        }

        Ok(Self {
            year,
            day_of_year,
            start_hour,
            end_hour,
        })
    }

    pub fn for_date(date: NaiveDate, start_hour: u32, end_hour: u32) -> Result<Self> {
        let doy = day_of_year(date.year(), date.month(), date.day())?;
        Self::new(date.year(), doy, start_hour, end_hour)
    }

    pub fn full_day(date: NaiveDate) -> Result<Self> {
        Self::for_date(date, 0, HOURS_PER_DAY)
    }

    pub fn date(&self) -> NaiveDate {
        // validated in the constructor
        NaiveDate::from_yo_opt(self.year, self.day_of_year).unwrap_or_default()
    }

    pub fn duration_hours(&self) -> u32 {
        self.end_hour - self.start_hour
    }

    /// Two-digit year used by legacy names and the `{yy}d` directory.
    pub fn short_year(&self) -> u32 {
        self.year.rem_euclid(100) as u32
    }

    /// All quarter-hour slots in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        (self.start_hour..self.end_hour).flat_map(|hour| {
            QUARTER_MINUTES
                .iter()
                .map(move |&minute| Slot { hour, minute })
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (doy {:03}) {:02}:00-{:02}:00",
            self.date(),
            self.day_of_year,
            self.start_hour,
            self.end_hour
        )
    }
}
