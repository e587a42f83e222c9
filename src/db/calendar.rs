//! Calendar repository: read months and years, bulk-insert a materialized year.

use crate::entities::{calendars, prelude::*};
use crate::models::{CalendarDay, DayKind};
use sea_orm::*;

/// Rows per INSERT statement.
const INSERT_CHUNK: usize = 100;

/// Get calendar rows of one month (`month_key` = `YYYYMM`).
pub async fn find_by_month(
    db: &DatabaseConnection,
    year: i32,
    month_key: &str,
) -> Result<Vec<calendars::Model>, DbErr> {
    Calendars::find()
        .filter(calendars::Column::Year.eq(year))
        .filter(calendars::Column::Month.eq(month_key))
        .order_by_asc(calendars::Column::Date)
        .all(db)
        .await
}

/// Get all calendar rows of a year.
pub async fn find_by_year(db: &DatabaseConnection, year: i32) -> Result<Vec<calendars::Model>, DbErr> {
    Calendars::find()
        .filter(calendars::Column::Year.eq(year))
        .order_by_asc(calendars::Column::Date)
        .all(db)
        .await
}

/// Count calendar rows of a year.
pub async fn count_by_year(db: &DatabaseConnection, year: i32) -> Result<u64, DbErr> {
    Calendars::find()
        .filter(calendars::Column::Year.eq(year))
        .count(db)
        .await
}

/// Insert calendar days in chunks inside one transaction.
///
/// Either every day is inserted or none is.
pub async fn insert_batch(db: &DatabaseConnection, days: &[CalendarDay]) -> Result<usize, DbErr> {
    let txn = db.begin().await?;

    for chunk in days.chunks(INSERT_CHUNK) {
        let models = chunk.iter().map(to_active_model);
        Calendars::insert_many(models).exec(&txn).await?;
    }

    txn.commit().await?;
    Ok(days.len())
}

fn to_active_model(day: &CalendarDay) -> calendars::ActiveModel {
    calendars::ActiveModel {
        year: Set(day.year()),
        month: Set(day.month_key()),
        date: Set(day.date_key()),
        week: Set(i16::from(day.week)),
        workday: Set(day.kind.code()),
        ..Default::default()
    }
}

/// Convert a stored row into a calendar day.
pub fn to_calendar_day(model: &calendars::Model) -> Result<CalendarDay, DbErr> {
    let date = CalendarDay::parse_date_key(&model.date)
        .ok_or_else(|| DbErr::Custom(format!("Invalid calendar date '{}' (id {})", model.date, model.id)))?;
    let kind = DayKind::from_code(model.workday)
        .ok_or_else(|| DbErr::Custom(format!("Invalid workday code {} for {}", model.workday, model.date)))?;

    Ok(CalendarDay {
        date,
        week: u8::try_from(model.week).unwrap_or(0),
        kind,
    })
}
