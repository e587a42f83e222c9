//! Report period (one calendar month).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Earliest year accepted for reports and calendars.
pub const MIN_YEAR: i32 = 1970;
/// Latest year accepted for reports and calendars.
pub const MAX_YEAR: i32 = 9999;

/// A validated `(year, month)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    year: i32,
    month: u32,
}

impl ReportPeriod {
    /// Validate and build a period.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        validate_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(AppError::validation(format!("Month {month} is outside 1-12")));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Month key in `YYYYMM` form.
    pub fn month_key(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn first_day(&self) -> NaiveDate {
        // Year and month are validated in `new`.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    /// Every date of the month in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let first = self.first_day();
        (0..self.days_in_month()).filter_map(move |offset| first.checked_add_days(chrono::Days::new(offset.into())))
    }
}

/// Reject years outside the supported range.
pub fn validate_year(year: i32) -> Result<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AppError::validation(format!(
            "Year {year} is outside {MIN_YEAR}-{MAX_YEAR}"
        )));
    }
    Ok(())
}
