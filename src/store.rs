//! Collaborator interfaces used by the report core.
//!
//! The core only talks to these traits; `DbStore` backs the punch and
//! calendar stores with PostgreSQL and `HolidayClient` backs the holiday
//! source with the external HTTP API.

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use sea_orm::DatabaseConnection;

use crate::db;
use crate::error::Result;
use crate::holiday::HolidayDay;
use crate::models::{Calendar, CalendarDay, PunchRecord, ReportPeriod};

/// Read access to raw punch records.
#[async_trait]
pub trait PunchStore: Send + Sync + 'static {
    /// Records whose local day lies within `[start, end]`.
    async fn find_punches(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PunchRecord>>;
}

/// Persistent workday calendar.
#[async_trait]
pub trait CalendarStore: Send + Sync + 'static {
    /// Calendar days of one month.
    async fn find_calendar(&self, period: &ReportPeriod) -> Result<Calendar>;

    /// Calendar days of a whole year.
    async fn find_year(&self, year: i32) -> Result<Calendar>;

    /// Number of stored days for a year.
    async fn count_year(&self, year: i32) -> Result<u64>;

    /// Insert all days or none.
    async fn bulk_insert(&self, days: &[CalendarDay]) -> Result<()>;
}

/// External workday/rest-day classification.
#[async_trait]
pub trait HolidaySource: Send + Sync + 'static {
    async fn fetch(&self, year: i32, max_days: u32) -> Result<Vec<HolidayDay>>;
}

/// PostgreSQL-backed punch and calendar store.
#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
    offset: FixedOffset,
}

impl DbStore {
    /// `offset` is the local zone punch days are normalized to.
    pub fn new(db: DatabaseConnection, offset: FixedOffset) -> Self {
        Self { db, offset }
    }
}

fn to_calendar(rows: &[crate::entities::calendars::Model]) -> Result<Calendar> {
    rows.iter()
        .map(|row| db::calendar::to_calendar_day(row).map_err(Into::into))
        .collect()
}

#[async_trait]
impl PunchStore for DbStore {
    async fn find_punches(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PunchRecord>> {
        let rows = db::punch::get_by_date_range(&self.db, start, end, self.offset).await?;
        Ok(rows
            .into_iter()
            .map(|row| db::punch::to_punch_record(row, self.offset))
            .collect())
    }
}

#[async_trait]
impl CalendarStore for DbStore {
    async fn find_calendar(&self, period: &ReportPeriod) -> Result<Calendar> {
        let rows = db::calendar::find_by_month(&self.db, period.year(), &period.month_key()).await?;
        to_calendar(&rows)
    }

    async fn find_year(&self, year: i32) -> Result<Calendar> {
        let rows = db::calendar::find_by_year(&self.db, year).await?;
        to_calendar(&rows)
    }

    async fn count_year(&self, year: i32) -> Result<u64> {
        Ok(db::calendar::count_by_year(&self.db, year).await?)
    }

    async fn bulk_insert(&self, days: &[CalendarDay]) -> Result<()> {
        db::calendar::insert_batch(&self.db, days).await?;
        Ok(())
    }
}
