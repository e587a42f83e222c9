//! Punch record repository for reporting.

use crate::entities::{prelude::*, records};
use crate::models::PunchRecord;
use crate::models::punch::normalize_punch;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use sea_orm::*;

/// Get punch records whose day falls within `[start_date, end_date]` in the local zone.
///
/// Results are ordered by user and day.
pub async fn get_by_date_range(
    db: &DatabaseConnection,
    start_date: NaiveDate,
    end_date: NaiveDate,
    offset: FixedOffset,
) -> Result<Vec<records::Model>, DbErr> {
    let (start, end) = local_day_bounds(start_date, end_date, offset)?;

    Records::find()
        .filter(records::Column::DaysDate.between(start, end))
        .order_by_asc(records::Column::UserId)
        .order_by_asc(records::Column::DaysDate)
        .all(db)
        .await
}

/// Local midnight of `start_date` through 23:59:59 of `end_date`.
fn local_day_bounds(
    start_date: NaiveDate,
    end_date: NaiveDate,
    offset: FixedOffset,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), DbErr> {
    let start = start_date
        .and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| DbErr::Custom(format!("Invalid range start {start_date}")))?;
    let end = end_date
        .and_hms_opt(23, 59, 59)
        .and_then(|dt| dt.and_local_timezone(offset).single())
        .ok_or_else(|| DbErr::Custom(format!("Invalid range end {end_date}")))?;
    Ok((start, end))
}

/// Convert a stored row, normalizing the day to the local zone.
pub fn to_punch_record(model: records::Model, offset: FixedOffset) -> PunchRecord {
    PunchRecord {
        user_id: model.user_id,
        username: model.username,
        firstname: model.firstname,
        day: model.days_date.with_timezone(&offset).date_naive(),
        on_work: normalize_punch(model.onwork_time.map(|t| t.with_timezone(&Utc))),
        off_work: normalize_punch(model.offwork_time.map(|t| t.with_timezone(&Utc))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn test_local_day_bounds() {
        let (start, end) = local_day_bounds(
            NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(),
            cst(),
        )
        .unwrap();

        assert_eq!(start.with_timezone(&Utc), Utc.with_ymd_and_hms(2023, 4, 30, 16, 0, 0).unwrap());
        assert_eq!(end.with_timezone(&Utc), Utc.with_ymd_and_hms(2023, 5, 31, 15, 59, 59).unwrap());
    }

    #[test]
    fn test_to_punch_record_normalizes_day_and_zero_times() {
        // Local midnight stored as the previous UTC evening.
        let days_date = Utc.with_ymd_and_hms(2023, 5, 9, 16, 0, 0).unwrap().fixed_offset();
        let model = records::Model {
            id: 1,
            user_id: "U1".to_string(),
            firstname: "Alice".to_string(),
            username: String::new(),
            days_date,
            onwork_time: Some(Utc.with_ymd_and_hms(2023, 5, 10, 1, 15, 0).unwrap().fixed_offset()),
            offwork_time: Some(Utc.timestamp_opt(0, 0).unwrap().fixed_offset()),
        };

        let record = to_punch_record(model, cst());
        assert_eq!(record.day, NaiveDate::from_ymd_opt(2023, 5, 10).unwrap());
        assert!(record.on_work.is_some());
        assert_eq!(record.off_work, None);
        assert_eq!(record.display_name(), "Alice");
    }
}
