//! Report generation pipeline.
//!
//! Validate the period, resolve the month's calendar, read punches,
//! classify, tabulate and render.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::calendar::CalendarResolver;
use crate::classify::{AttendanceRules, classify_all};
use crate::error::Result;
use crate::export::{ReportRenderer, report_filename};
use crate::models::ReportPeriod;
use crate::report::{ReportGrid, ReportVariant, tabulate};
use crate::store::PunchStore;

/// A rendered report ready to be written or downloaded.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    /// Number of user blocks in the report.
    pub users: usize,
}

impl RenderedReport {
    /// Write the document to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Entry point for calendar initialization and report generation.
#[derive(Clone)]
pub struct ReportService {
    punches: Arc<dyn PunchStore>,
    calendar: CalendarResolver,
    renderer: Arc<dyn ReportRenderer>,
    rules: AttendanceRules,
}

impl ReportService {
    pub fn new(
        punches: Arc<dyn PunchStore>,
        calendar: CalendarResolver,
        renderer: Arc<dyn ReportRenderer>,
        rules: AttendanceRules,
    ) -> Self {
        Self {
            punches,
            calendar,
            renderer,
            rules,
        }
    }

    pub fn rules(&self) -> &AttendanceRules {
        &self.rules
    }

    /// Materialize a year's calendar. Returns the number of days known for the year.
    pub async fn init_calendar(&self, year: i32) -> Result<usize> {
        let calendar = self.calendar.resolve(year).await?;
        info!("Calendar for {year} has {} days", calendar.len());
        Ok(calendar.len())
    }

    /// Classify and lay out one month.
    pub async fn build_grid(&self, period: &ReportPeriod, variant: ReportVariant) -> Result<ReportGrid> {
        let calendar = self.calendar.resolve_month(period).await?;
        let records = self.punches.find_punches(period.first_day(), period.last_day()).await?;
        debug!(
            "Loaded {} punch records and {} calendar days for {}",
            records.len(),
            calendar.len(),
            period.month_key()
        );

        let users = classify_all(records, &calendar, period, &self.rules);
        Ok(tabulate(period, &calendar, &users, variant))
    }

    /// Produce the report document for `year`/`month`.
    pub async fn generate(&self, year: i32, month: u32, variant: ReportVariant) -> Result<RenderedReport> {
        let period = ReportPeriod::new(year, month)?;
        let grid = self.build_grid(&period, variant).await?;
        let users = (grid.row_count() - crate::report::HEADER_ROWS) / variant.block_height();
        let bytes = self.renderer.render(&grid)?;

        info!(
            "Generated {} report for {}: {} users, {} bytes",
            variant.slug(),
            period.month_key(),
            users,
            bytes.len()
        );

        Ok(RenderedReport {
            file_name: report_filename(variant, &period),
            content_type: self.renderer.content_type(),
            bytes,
            users,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::export::XlsxRenderer;
    use crate::models::PunchRecord;
    use crate::report::{CellValue, LEADING_COLUMNS};
    use crate::store::memory::{MemoryStore, WeekendHolidays};
    use chrono::{NaiveDate, TimeZone, Utc};

    pub(crate) fn service(store: Arc<MemoryStore>, source: Arc<WeekendHolidays>) -> ReportService {
        let resolver = CalendarResolver::new(store.clone(), source, 366);
        ReportService::new(store, resolver, Arc::new(XlsxRenderer), AttendanceRules::default())
    }

    fn punch(user: &str, day: u32, on: Option<(u32, u32)>, off: Option<(u32, u32)>) -> PunchRecord {
        // Local UTC+8 wall-clock times.
        let at = |(h, m): (u32, u32)| Utc.with_ymd_and_hms(2023, 5, day, h, m, 0).unwrap() - chrono::TimeDelta::hours(8);
        PunchRecord {
            user_id: user.to_string(),
            username: user.to_lowercase(),
            firstname: String::new(),
            day: NaiveDate::from_ymd_opt(2023, 5, day).unwrap(),
            on_work: on.map(at),
            off_work: off.map(at),
        }
    }

    #[tokio::test]
    async fn test_generate_with_empty_calendar_fetches_once() {
        let store = Arc::new(MemoryStore::with_punches(vec![punch("U1", 4, Some((9, 0)), Some((18, 30)))]));
        let source = Arc::new(WeekendHolidays::default());
        let service = service(store.clone(), source.clone());

        let report = service.generate(2023, 5, ReportVariant::Detail).await.unwrap();
        assert_eq!(report.file_name, "attendance_detail_202305.xlsx");
        assert_eq!(report.users, 1);
        assert_eq!(&report.bytes[..2], b"PK");
        assert_eq!(source.fetch_calls(), 1);
        assert_eq!(store.insert_calls(), 1);

        service.generate(2023, 5, ReportVariant::Record).await.unwrap();
        assert_eq!(source.fetch_calls(), 1);
        assert_eq!(store.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_month_is_rejected_before_lookups() {
        let store = Arc::new(MemoryStore::default());
        let source = Arc::new(WeekendHolidays::default());
        let service = service(store.clone(), source.clone());

        for month in [0, 13] {
            let err = service.generate(2023, month, ReportVariant::Record).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(source.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let store = Arc::new(MemoryStore::default());
        let source = Arc::new(WeekendHolidays {
            fail: true,
            ..WeekendHolidays::default()
        });
        let err = service(store, source)
            .generate(2023, 5, ReportVariant::Detail)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_build_grid_counts() {
        // 2023-05-04 is a Thursday, 2023-05-06 a Saturday.
        let store = Arc::new(MemoryStore::with_punches(vec![
            punch("U1", 4, Some((9, 45)), Some((17, 0))),
            punch("U1", 6, Some((10, 0)), None),
            punch("U2", 4, Some((9, 0)), Some((18, 0))),
        ]));
        let service = service(store, Arc::new(WeekendHolidays::default()));
        let period = ReportPeriod::new(2023, 5).unwrap();

        let grid = service.build_grid(&period, ReportVariant::Detail).await.unwrap();
        let summary = LEADING_COLUMNS + 31;
        let height = ReportVariant::Detail.block_height();

        // May 2023 has 23 weekdays.
        assert_eq!(grid.cell(1, summary), &CellValue::text("Summary (23 workdays)"));

        // U1: one present day (late, early, short), 22 absences; the Saturday is ignored.
        let u1 = 3;
        assert_eq!(grid.cell(u1, summary), &CellValue::Number(1.0));
        assert_eq!(grid.cell(u1, summary + 1), &CellValue::Number(22.0));
        assert_eq!(grid.cell(u1, summary + 2), &CellValue::Number(1.0));
        assert_eq!(grid.cell(u1, summary + 3), &CellValue::Number(1.0));
        assert_eq!(grid.cell(u1, summary + 4), &CellValue::Number(1.0));
        assert_eq!(grid.cell(u1, summary + 5), &CellValue::Number(0.0));
        assert_eq!(grid.cell(u1, LEADING_COLUMNS + 5), &CellValue::Empty);

        // U2: on time, exactly nine hours.
        let u2 = u1 + height;
        assert_eq!(grid.cell(u2, 1), &CellValue::text("u2"));
        assert_eq!(grid.cell(u2, summary + 2), &CellValue::Number(0.0));
        assert_eq!(grid.cell(u2, summary + 4), &CellValue::Number(0.0));
        assert_eq!(grid.cell(u2 + 2, LEADING_COLUMNS + 3), &CellValue::text("9.0"));
    }

    #[tokio::test]
    async fn test_incomplete_calendar_fails_report() {
        let store = Arc::new(MemoryStore::with_punches(vec![punch("U1", 10, Some((9, 0)), Some((18, 0)))]));
        store.calendar.lock().unwrap().insert(crate::models::CalendarDay {
            date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            week: 1,
            kind: crate::models::DayKind::Workday,
        });
        let source = Arc::new(WeekendHolidays::default());
        let service = service(store, source.clone());
        let period = ReportPeriod::new(2023, 5).unwrap();

        let err = service.build_grid(&period, ReportVariant::Detail).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(source.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_write_report_file() {
        let store = Arc::new(MemoryStore::default());
        let report = service(store, Arc::new(WeekendHolidays::default()))
            .generate(2023, 2, ReportVariant::Record)
            .await
            .unwrap();

        let path = std::env::temp_dir().join(format!("attendance-report-{}.xlsx", std::process::id()));
        report.write_to(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), report.bytes);
        std::fs::remove_file(&path).unwrap();

        let missing_dir = std::env::temp_dir().join("attendance-report-no-such-dir").join("out.xlsx");
        assert!(matches!(report.write_to(&missing_dir), Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_init_calendar_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let source = Arc::new(WeekendHolidays::default());
        let service = service(store.clone(), source.clone());

        assert_eq!(service.init_calendar(2023).await.unwrap(), 365);
        assert_eq!(service.init_calendar(2023).await.unwrap(), 365);
        assert_eq!(source.fetch_calls(), 1);
        assert_eq!(store.insert_calls(), 1);
    }
}
