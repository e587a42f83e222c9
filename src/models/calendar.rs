//! Workday calendar types.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::period::ReportPeriod;

/// Work classification of a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayKind {
    Workday,
    RestDay,
}

impl DayKind {
    /// Stored code for a workday.
    pub const WORKDAY_CODE: i16 = 1;
    /// Stored code for a rest day.
    pub const REST_DAY_CODE: i16 = 2;

    /// Decode the stored workday column.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            Self::WORKDAY_CODE => Some(Self::Workday),
            Self::REST_DAY_CODE => Some(Self::RestDay),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            Self::Workday => Self::WORKDAY_CODE,
            Self::RestDay => Self::REST_DAY_CODE,
        }
    }
}

/// One date's work classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Weekday as reported by the holiday source (1 = Monday .. 7 = Sunday, 0 = unknown).
    pub week: u8,
    pub kind: DayKind,
}

impl CalendarDay {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Month key in `YYYYMM` form.
    pub fn month_key(&self) -> String {
        self.date.format("%Y%m").to_string()
    }

    /// Date key in `YYYYMMDD` form.
    pub fn date_key(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    pub fn is_workday(&self) -> bool {
        self.kind == DayKind::Workday
    }

    /// Parse a `YYYYMMDD` date key.
    pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(key.trim(), "%Y%m%d").ok()
    }
}

/// Calendar days keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    days: BTreeMap<NaiveDate, CalendarDay>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a day, replacing any existing entry for the same date.
    pub fn insert(&mut self, day: CalendarDay) {
        self.days.insert(day.date, day);
    }

    pub fn get(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.get(&date)
    }

    /// Missing dates count as rest days.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        self.get(date).is_some_and(CalendarDay::is_workday)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.days.values()
    }

    /// Number of workdays within the period.
    pub fn workday_count(&self, period: &ReportPeriod) -> usize {
        period.dates().filter(|date| self.is_workday(*date)).count()
    }

    /// Restrict the calendar to a single month.
    pub fn month(&self, period: &ReportPeriod) -> Calendar {
        let days = self
            .days
            .range(period.first_day()..=period.last_day())
            .map(|(date, day)| (*date, day.clone()))
            .collect();
        Calendar { days }
    }
}

impl FromIterator<CalendarDay> for Calendar {
    fn from_iter<I: IntoIterator<Item = CalendarDay>>(iter: I) -> Self {
        let mut calendar = Calendar::new();
        for day in iter {
            calendar.insert(day);
        }
        calendar
    }
}
