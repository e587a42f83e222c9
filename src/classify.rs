//! Monthly attendance classification.
//!
//! Every calendar day of a month is classified per user as a rest day, an
//! absence, or a present day. Present days additionally carry the late,
//! early-leave, short-duration and missing-punch flags. Rest days never
//! touch the counters.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc};
use std::collections::BTreeMap;

use crate::models::{Calendar, PunchRecord, ReportPeriod};

/// Fixed local zone used when none is configured (UTC+8).
pub fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap_or_else(|| Utc.fix())
}

/// Thresholds applied to a present day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceRules {
    /// Local zone for thresholds and display.
    pub offset: FixedOffset,
    /// On-work punches strictly after this time are late.
    pub on_work_deadline: NaiveTime,
    /// Off-work punches strictly before this time are early leaves.
    pub off_work_earliest: NaiveTime,
    /// Worked time strictly below this is short.
    pub min_work_duration: TimeDelta,
}

impl Default for AttendanceRules {
    fn default() -> Self {
        Self {
            offset: default_offset(),
            on_work_deadline: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            off_work_earliest: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            min_work_duration: TimeDelta::hours(9),
        }
    }
}

impl AttendanceRules {
    /// The instant `time` on `date` in the configured local zone.
    pub fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
        let utc = date.and_time(time) - TimeDelta::seconds(i64::from(self.offset.local_minus_utc()));
        utc.and_utc().with_timezone(&self.offset)
    }

    /// Convert a stored instant into the local zone.
    pub fn to_local(&self, ts: DateTime<Utc>) -> DateTime<FixedOffset> {
        ts.with_timezone(&self.offset)
    }
}

/// A user's punch records for one month, keyed by local day.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPunches {
    pub user_id: String,
    pub display_name: String,
    pub days: BTreeMap<NaiveDate, PunchRecord>,
}

/// Group raw records by user.
///
/// Records are sorted by `(user_id, day)` first, so the display name comes
/// from the user's most recent record and a later duplicate for the same day
/// replaces an earlier one. Users are returned in ascending id order.
pub fn group_by_user(mut records: Vec<PunchRecord>) -> Vec<UserPunches> {
    records.sort_by(|a, b| a.user_id.cmp(&b.user_id).then(a.day.cmp(&b.day)));

    let mut users: Vec<UserPunches> = Vec::new();
    for record in records {
        match users.last_mut() {
            Some(user) if user.user_id == record.user_id => {
                user.display_name = record.display_name().to_string();
                user.days.insert(record.day, record);
            }
            _ => {
                let mut days = BTreeMap::new();
                let user_id = record.user_id.clone();
                let display_name = record.display_name().to_string();
                days.insert(record.day, record);
                users.push(UserPunches {
                    user_id,
                    display_name,
                    days,
                });
            }
        }
    }
    users
}

/// Flags and punch details of a workday with a record.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentDay {
    pub on_work: Option<DateTime<FixedOffset>>,
    pub off_work: Option<DateTime<FixedOffset>>,
    pub late: bool,
    pub early_leave: bool,
    pub missing_punch: bool,
    /// Elapsed time between the punches, only when both exist.
    pub duration: Option<TimeDelta>,
    pub short_duration: bool,
}

impl PresentDay {
    /// Worked hours, only when both punches exist.
    pub fn work_hours(&self) -> Option<f64> {
        self.duration.map(|d| d.num_milliseconds() as f64 / 3_600_000.0)
    }
}

/// Classification of one user on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayStatus {
    /// Not a workday; nothing is evaluated.
    RestDay,
    /// Workday without any record.
    Absent,
    /// Workday with a record.
    Present(PresentDay),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    pub status: DayStatus,
}

/// Monthly day counts per user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounters {
    pub attendance: u32,
    pub absence: u32,
    pub late: u32,
    pub early_leave: u32,
    pub short_duration: u32,
    pub missing_punch: u32,
}

impl DayCounters {
    /// Values in report column order.
    pub fn as_array(&self) -> [u32; 6] {
        [
            self.attendance,
            self.absence,
            self.late,
            self.early_leave,
            self.short_duration,
            self.missing_punch,
        ]
    }
}

/// A user's classified month.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAttendance {
    pub user_id: String,
    pub display_name: String,
    pub days: Vec<AttendanceDay>,
    pub counters: DayCounters,
}

/// Evaluate the flags of a workday that has a record.
pub fn classify_present_day(date: NaiveDate, record: &PunchRecord, rules: &AttendanceRules) -> PresentDay {
    let on_work = record.on_work.map(|t| rules.to_local(t));
    let off_work = record.off_work.map(|t| rules.to_local(t));

    let late = on_work.is_some_and(|t| t > rules.local_instant(date, rules.on_work_deadline));
    let early_leave = off_work.is_some_and(|t| t < rules.local_instant(date, rules.off_work_earliest));
    let missing_punch = record.has_missing_punch();

    let duration = match (on_work, off_work) {
        (Some(on), Some(off)) => Some(off - on),
        _ => None,
    };
    let short_duration = duration.is_some_and(|d| d < rules.min_work_duration);

    PresentDay {
        on_work,
        off_work,
        late,
        early_leave,
        missing_punch,
        duration,
        short_duration,
    }
}

/// Classify every day of `period` for one user.
///
/// The calendar must already cover the month; dates without an entry are
/// treated as rest days.
pub fn classify(
    user: &UserPunches,
    calendar: &Calendar,
    period: &ReportPeriod,
    rules: &AttendanceRules,
) -> UserAttendance {
    let mut counters = DayCounters::default();
    let mut days = Vec::with_capacity(period.days_in_month() as usize);

    for date in period.dates() {
        let status = if !calendar.is_workday(date) {
            DayStatus::RestDay
        } else if let Some(record) = user.days.get(&date) {
            let day = classify_present_day(date, record, rules);
            counters.attendance += 1;
            counters.late += u32::from(day.late);
            counters.early_leave += u32::from(day.early_leave);
            counters.missing_punch += u32::from(day.missing_punch);
            counters.short_duration += u32::from(day.short_duration);
            DayStatus::Present(day)
        } else {
            counters.absence += 1;
            DayStatus::Absent
        };
        days.push(AttendanceDay { date, status });
    }

    UserAttendance {
        user_id: user.user_id.clone(),
        display_name: user.display_name.clone(),
        days,
        counters,
    }
}

/// Classify all users of a month.
pub fn classify_all(
    records: Vec<PunchRecord>,
    calendar: &Calendar,
    period: &ReportPeriod,
    rules: &AttendanceRules,
) -> Vec<UserAttendance> {
    group_by_user(records)
        .iter()
        .map(|user| classify(user, calendar, period, rules))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalendarDay, DayKind};
    use chrono::{Datelike, TimeZone, Weekday};

    fn cst(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        default_offset()
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Weekdays are workdays, weekends rest days.
    fn weekday_calendar(period: &ReportPeriod) -> Calendar {
        period
            .dates()
            .map(|date| CalendarDay {
                date,
                week: date.weekday().number_from_monday() as u8,
                kind: match date.weekday() {
                    Weekday::Sat | Weekday::Sun => DayKind::RestDay,
                    _ => DayKind::Workday,
                },
            })
            .collect()
    }

    fn punch(
        user_id: &str,
        day: NaiveDate,
        on_work: Option<DateTime<Utc>>,
        off_work: Option<DateTime<Utc>>,
    ) -> PunchRecord {
        PunchRecord {
            user_id: user_id.to_string(),
            username: String::new(),
            firstname: user_id.to_string(),
            day,
            on_work,
            off_work,
        }
    }

    fn present(status: &DayStatus) -> &PresentDay {
        match status {
            DayStatus::Present(day) => day,
            other => panic!("expected present day, got {other:?}"),
        }
    }

    #[test]
    fn test_single_record_month() {
        let period = ReportPeriod::new(2023, 5).unwrap();
        let calendar = weekday_calendar(&period);
        let records = vec![punch(
            "U1",
            date(2023, 5, 10),
            Some(cst(2023, 5, 10, 9, 15, 0)),
            Some(cst(2023, 5, 10, 19, 0, 0)),
        )];

        let users = classify_all(records, &calendar, &period, &AttendanceRules::default());
        assert_eq!(users.len(), 1);
        let u1 = &users[0];
        assert_eq!(u1.days.len(), 31);

        let day10 = present(&u1.days[9].status);
        assert!(!day10.late);
        assert!(!day10.early_leave);
        assert!(!day10.short_duration);
        assert!(!day10.missing_punch);
        assert_eq!(day10.work_hours(), Some(9.75));

        let workdays = calendar.workday_count(&period) as u32;
        assert_eq!(u1.counters.attendance, 1);
        assert_eq!(u1.counters.absence, workdays - 1);
        assert_eq!(u1.counters.late, 0);
        assert_eq!(u1.counters.short_duration, 0);

        for day in &u1.days {
            if day.date == date(2023, 5, 10) {
                continue;
            }
            let expected_absent = calendar.is_workday(day.date);
            assert_eq!(matches!(day.status, DayStatus::Absent), expected_absent);
            assert_eq!(matches!(day.status, DayStatus::RestDay), !expected_absent);
        }
    }

    #[test]
    fn test_late_with_missing_off_work() {
        let period = ReportPeriod::new(2023, 5).unwrap();
        let calendar = weekday_calendar(&period);
        let records = vec![punch("U2", date(2023, 5, 12), Some(cst(2023, 5, 12, 10, 0, 0)), None)];

        let users = classify_all(records, &calendar, &period, &AttendanceRules::default());
        let day12 = present(&users[0].days[11].status);
        assert!(day12.late);
        assert!(day12.missing_punch);
        assert!(!day12.early_leave);
        assert_eq!(day12.duration, None);
        assert!(!day12.short_duration);
        assert_eq!(users[0].counters.late, 1);
        assert_eq!(users[0].counters.missing_punch, 1);
        assert_eq!(users[0].counters.short_duration, 0);
    }

    #[test]
    fn test_both_punches_missing_counts_once() {
        let rules = AttendanceRules::default();
        let day = classify_present_day(date(2023, 5, 12), &punch("U3", date(2023, 5, 12), None, None), &rules);
        assert!(day.missing_punch);
        assert!(!day.late);
        assert!(!day.early_leave);

        let period = ReportPeriod::new(2023, 5).unwrap();
        let calendar = weekday_calendar(&period);
        let users = classify_all(
            vec![punch("U3", date(2023, 5, 12), None, None)],
            &calendar,
            &period,
            &rules,
        );
        assert_eq!(users[0].counters.missing_punch, 1);
        assert_eq!(users[0].counters.attendance, 1);
    }

    #[test]
    fn test_late_threshold_is_exclusive() {
        let rules = AttendanceRules::default();
        let d = date(2023, 5, 12);
        let on_time = classify_present_day(d, &punch("U", d, Some(cst(2023, 5, 12, 9, 30, 0)), None), &rules);
        let late = classify_present_day(d, &punch("U", d, Some(cst(2023, 5, 12, 9, 30, 1)), None), &rules);
        assert!(!on_time.late);
        assert!(late.late);
    }

    #[test]
    fn test_early_threshold_is_exclusive() {
        let rules = AttendanceRules::default();
        let d = date(2023, 5, 12);
        let on_time = classify_present_day(d, &punch("U", d, None, Some(cst(2023, 5, 12, 18, 0, 0))), &rules);
        let early = classify_present_day(d, &punch("U", d, None, Some(cst(2023, 5, 12, 17, 59, 59))), &rules);
        assert!(!on_time.early_leave);
        assert!(early.early_leave);
    }

    #[test]
    fn test_short_duration_boundary() {
        let rules = AttendanceRules::default();
        let d = date(2023, 5, 12);
        let full = classify_present_day(
            d,
            &punch("U", d, Some(cst(2023, 5, 12, 9, 0, 0)), Some(cst(2023, 5, 12, 18, 0, 0))),
            &rules,
        );
        let short = classify_present_day(
            d,
            &punch("U", d, Some(cst(2023, 5, 12, 9, 0, 1)), Some(cst(2023, 5, 12, 18, 0, 0))),
            &rules,
        );
        assert!(!full.short_duration);
        assert_eq!(full.duration, Some(TimeDelta::hours(9)));
        assert!(short.short_duration);
        assert_eq!(short.duration, Some(TimeDelta::hours(9) - TimeDelta::seconds(1)));
    }

    #[test]
    fn test_thresholds_use_configured_offset() {
        // 01:30 UTC is 09:30 at UTC+8 but 10:30 at UTC+9.
        let d = date(2023, 5, 12);
        let record = punch("U", d, Some(Utc.with_ymd_and_hms(2023, 5, 12, 1, 30, 0).unwrap()), None);

        let cst_rules = AttendanceRules::default();
        let jst_rules = AttendanceRules {
            offset: FixedOffset::east_opt(9 * 3600).unwrap(),
            ..AttendanceRules::default()
        };
        assert!(!classify_present_day(d, &record, &cst_rules).late);
        assert!(classify_present_day(d, &record, &jst_rules).late);
    }

    #[test]
    fn test_rest_day_records_are_ignored() {
        let period = ReportPeriod::new(2023, 5).unwrap();
        let calendar = weekday_calendar(&period);
        // 2023-05-13 is a Saturday.
        let records = vec![punch(
            "U4",
            date(2023, 5, 13),
            Some(cst(2023, 5, 13, 11, 0, 0)),
            Some(cst(2023, 5, 13, 12, 0, 0)),
        )];
        let users = classify_all(records, &calendar, &period, &AttendanceRules::default());
        assert_eq!(users[0].days[12].status, DayStatus::RestDay);
        assert_eq!(users[0].counters.attendance, 0);
        assert_eq!(users[0].counters.late, 0);
    }

    #[test]
    fn test_every_day_has_exactly_one_state() {
        let period = ReportPeriod::new(2024, 2).unwrap();
        let calendar = weekday_calendar(&period);
        let records = vec![
            punch("A", date(2024, 2, 1), Some(cst(2024, 2, 1, 9, 0, 0)), None),
            punch("A", date(2024, 2, 2), None, Some(cst(2024, 2, 2, 17, 0, 0))),
        ];
        let users = classify_all(records, &calendar, &period, &AttendanceRules::default());
        let a = &users[0];

        let rest = a.days.iter().filter(|d| d.status == DayStatus::RestDay).count() as u32;
        let c = a.counters;
        assert_eq!(rest + c.attendance + c.absence, period.days_in_month());
        assert_eq!(c.attendance + c.absence, calendar.workday_count(&period) as u32);
        assert_eq!(c.early_leave, 1);
        assert_eq!(c.missing_punch, 2);
    }

    #[test]
    fn test_group_by_user_sorts_and_takes_latest_name() {
        let mut r1 = punch("U2", date(2023, 5, 3), None, None);
        r1.username = "new.name".to_string();
        let mut r2 = punch("U2", date(2023, 5, 1), None, None);
        r2.username = "old.name".to_string();
        let r3 = punch("U1", date(2023, 5, 2), None, None);

        let users = group_by_user(vec![r1, r2, r3]);
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, "U1");
        assert_eq!(users[1].user_id, "U2");
        assert_eq!(users[1].display_name, "new.name");
        assert_eq!(users[1].days.len(), 2);
    }

    #[test]
    fn test_group_by_user_last_record_for_day_wins() {
        let first = punch("U1", date(2023, 5, 2), None, None);
        let second = punch("U1", date(2023, 5, 2), Some(cst(2023, 5, 2, 9, 0, 0)), None);

        let users = group_by_user(vec![first, second.clone()]);
        assert_eq!(users[0].days.len(), 1);
        assert_eq!(users[0].days[&date(2023, 5, 2)], second);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let period = ReportPeriod::new(2023, 5).unwrap();
        let calendar = weekday_calendar(&period);
        let records = vec![
            punch("U1", date(2023, 5, 10), Some(cst(2023, 5, 10, 9, 45, 0)), Some(cst(2023, 5, 10, 17, 0, 0))),
            punch("U2", date(2023, 5, 11), Some(cst(2023, 5, 11, 8, 45, 0)), None),
        ];
        let rules = AttendanceRules::default();
        let first = classify_all(records.clone(), &calendar, &period, &rules);
        let second = classify_all(records, &calendar, &period, &rules);
        assert_eq!(first, second);
    }
}
