//! Year-months and the Sunday-first month grid

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ScheduleError};

/// Number of columns of a calendar grid (Sunday to Saturday)
pub const DAYS_PER_WEEK: usize = 7;

/// A validated calendar month, written `YYYY-MM`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// Returns `None` unless `year >= 1` and `month` is in `1..=12`
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if year < 1 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    /// The month that contains `date`
    pub fn of(date: NaiveDate) -> Self {
        Self { first: date.with_day(1).unwrap_or(date) }
    }

    pub fn year(&self) -> i32 { self.first.year() }
    pub fn month(&self) -> u32 { self.first.month() }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        let first = self.first_day();
        first + chrono::Duration::days(i64::from(self.days_in_month()) - 1)
    }

    /// Number of days in this month, leap years included
    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            4 | 6 | 9 | 11 => 30,
            2 if is_leap_year(self.year()) => 29,
            2 => 28,
            _ => 31,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// The next month. The last month chrono can represent is returned unchanged
    pub fn next(&self) -> Self {
        match self.last_day().succ_opt() {
            Some(first) => Self { first },
            None => *self,
        }
    }

    /// The previous month. January of year 1 has no predecessor and is returned unchanged
    pub fn prev(&self) -> Self {
        match self.first.pred_opt() {
            Some(last) if last.year() >= 1 => Self::of(last),
            _ => *self,
        }
    }

    /// Build the display grid of this month. See [`build_month_grid`]
    pub fn grid(&self) -> Vec<MonthCell> {
        let first = self.first_day();
        let leading = first.weekday().num_days_from_sunday() as usize;
        let days = self.days_in_month() as usize;
        let total = round_up_to_week(leading + days);

        let mut cells = Vec::with_capacity(total);
        cells.extend((0..leading).map(|_| MonthCell::filler()));
        let mut current = first;
        for _ in 0..days {
            cells.push(MonthCell::day(current));
            current = match current.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }
        while cells.len() % DAYS_PER_WEEK != 0 {
            cells.push(MonthCell::filler());
        }
        cells
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn round_up_to_week(len: usize) -> usize {
    (len + DAYS_PER_WEEK - 1) / DAYS_PER_WEEK * DAYS_PER_WEEK
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ScheduleError::InvalidMonthFormat(s.to_string());

        let mut parts = s.trim().splitn(2, '-');
        let year_part = parts.next().ok_or_else(invalid)?;
        let month_part = parts.next().ok_or_else(invalid)?;
        if year_part.is_empty() || month_part.len() != 2
            || year_part.chars().all(|c| c.is_ascii_digit()) == false
            || month_part.chars().all(|c| c.is_ascii_digit()) == false
        {
            return Err(invalid());
        }

        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<&str> for YearMonth {
    type Error = ScheduleError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> std::result::Result<YearMonth, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}



/// One slot of a month grid. Fillers (before day 1 or after the last day) have no date
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthCell {
    pub date: Option<NaiveDate>,
}

impl MonthCell {
    pub fn day(date: NaiveDate) -> Self {
        Self { date: Some(date) }
    }

    pub fn filler() -> Self {
        Self { date: None }
    }

    pub fn is_filler(&self) -> bool {
        self.date.is_none()
    }
}

/// Build the ordered cells of a Sunday-first month grid for `year_month` (`YYYY-MM`).
///
/// The grid starts with as many fillers as the weekday of day 1 (Sunday = 0), then holds one
/// cell per day, then fillers until its length is a multiple of 7 (28, 35 or 42 cells).
pub fn build_month_grid(year_month: &str) -> Result<Vec<MonthCell>> {
    let ym: YearMonth = year_month.parse()?;
    Ok(ym.grid())
}

/// Column (0 = Sunday) of the cell at `index` in a grid
pub fn column_of(index: usize) -> usize {
    index % DAYS_PER_WEEK
}
