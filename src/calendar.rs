//! Workday calendar resolution.
//!
//! A year's calendar is materialized from the holiday source the first time
//! it is needed and is read-only afterwards.

use chrono::{Datelike, NaiveDate};
use sea_orm::DbErr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::holiday::HolidayDay;
use crate::models::period::validate_year;
use crate::models::{Calendar, CalendarDay, DayKind, ReportPeriod};
use crate::store::{CalendarStore, HolidaySource};

/// Resolves calendars, materializing missing years once.
#[derive(Clone)]
pub struct CalendarResolver {
    store: Arc<dyn CalendarStore>,
    source: Arc<dyn HolidaySource>,
    max_days: u32,
}

impl CalendarResolver {
    pub fn new(store: Arc<dyn CalendarStore>, source: Arc<dyn HolidaySource>, max_days: u32) -> Self {
        Self {
            store,
            source,
            max_days,
        }
    }

    /// Calendar of a whole year, fetched and stored first if absent.
    ///
    /// Idempotent: a year that already has rows is only read.
    pub async fn resolve(&self, year: i32) -> Result<Calendar> {
        validate_year(year)?;
        self.ensure_year(year).await?;
        self.store.find_year(year).await
    }

    /// Calendar of one month, materializing its year if needed.
    ///
    /// Fails unless every date of the month has an entry.
    pub async fn resolve_month(&self, period: &ReportPeriod) -> Result<Calendar> {
        let calendar = self.store.find_calendar(period).await?;
        if covers_month(&calendar, period) {
            return Ok(calendar);
        }

        self.ensure_year(period.year()).await?;
        let calendar = self.store.find_calendar(period).await?;
        if !covers_month(&calendar, period) {
            warn!(
                "Calendar for {} is incomplete: {} of {} days stored",
                period.month_key(),
                calendar.len(),
                period.days_in_month()
            );
            return Err(AppError::Database(DbErr::Custom(format!(
                "Calendar for {} is incomplete ({} of {} days)",
                period.month_key(),
                calendar.len(),
                period.days_in_month()
            ))));
        }
        Ok(calendar)
    }

    /// Materialize `year` if it has no rows.
    async fn ensure_year(&self, year: i32) -> Result<()> {
        if self.store.count_year(year).await? > 0 {
            return Ok(());
        }

        info!("No calendar rows for {year}, fetching from holiday source");
        let entries = self.source.fetch(year, self.max_days).await?;
        let days = convert_entries(year, &entries)?;
        let expected = days_in_year(year);
        if days.len() != expected {
            return Err(AppError::upstream(format!(
                "Holiday source returned {} of {expected} days for {year}",
                days.len()
            )));
        }

        if let Err(e) = self.store.bulk_insert(&days).await {
            // The insert is all-or-nothing, so rows here were committed by a concurrent request.
            if self.store.count_year(year).await? > 0 {
                warn!("Calendar for {year} was stored concurrently: {e}");
                return Ok(());
            }
            return Err(e);
        }
        info!("Stored {} calendar days for {year}", days.len());
        Ok(())
    }
}

fn covers_month(calendar: &Calendar, period: &ReportPeriod) -> bool {
    period.dates().all(|date| calendar.get(date).is_some())
}

fn days_in_year(year: i32) -> usize {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366 } else { 365 }
}

/// Convert holiday entries of `year` into calendar days.
///
/// Entries of other years are skipped; malformed entries fail the whole batch.
fn convert_entries(year: i32, entries: &[HolidayDay]) -> Result<Vec<CalendarDay>> {
    let mut days = Vec::with_capacity(entries.len());
    for entry in entries {
        let date = CalendarDay::parse_date_key(&entry.date.to_string())
            .ok_or_else(|| AppError::upstream(format!("Invalid date {} from holiday source", entry.date)))?;
        if date.year() != year {
            continue;
        }
        let kind = DayKind::from_code(i16::from(entry.workday)).ok_or_else(|| {
            AppError::upstream(format!(
                "Invalid workday code {} for {} from holiday source",
                entry.workday, entry.date
            ))
        })?;
        days.push(CalendarDay {
            date,
            week: entry.week,
            kind,
        });
    }
    days.sort_by_key(|d| d.date);
    days.dedup_by_key(|d| d.date);
    Ok(days)
}
