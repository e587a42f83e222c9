//! Monthly report tabulation.
//!
//! Lays classified attendance out into a cell grid: a title row, two header
//! rows, then one block per user with the six summary counters on the right.
//! Both report variants share this layout and differ only in block height and
//! in how a day is projected into cells.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::classify::{DayStatus, PresentDay, UserAttendance};
use crate::models::{Calendar, ReportPeriod};

/// Serial number, name and row label columns.
pub const LEADING_COLUMNS: usize = 3;
/// Attendance, absence, late, early, short-duration and missing-punch columns.
pub const SUMMARY_COLUMNS: usize = 6;
/// Title plus two header rows.
pub const HEADER_ROWS: usize = 3;

pub const CARD_SYMBOL: &str = "√";
pub const NO_CARD_SYMBOL: &str = "×";
pub const UNKNOWN_DURATION_SYMBOL: &str = "-";
pub const FLAG_SYMBOL: &str = "1";

const SUMMARY_LABELS: [&str; SUMMARY_COLUMNS] = [
    "Attendance",
    "Absence",
    "Late",
    "Early Leave",
    "Short Hours",
    "Missing Punch",
];

/// Report flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportVariant {
    /// Punch times, worked hours and late/early flags (5 rows per user).
    Detail,
    /// Presence symbols only (2 rows per user).
    Record,
}

/// Fixed column widths of a variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnWidths {
    pub serial: f64,
    pub name: f64,
    pub label: f64,
    pub day: f64,
    pub summary: f64,
}

impl ReportVariant {
    /// Rows per user block.
    pub fn block_height(self) -> usize {
        self.row_labels().len()
    }

    /// Column C labels of a user block.
    pub fn row_labels(self) -> &'static [&'static str] {
        match self {
            Self::Detail => &["On", "Off", "Hours", "Late", "Early"],
            Self::Record => &["On", "Off"],
        }
    }

    pub fn column_widths(self) -> ColumnWidths {
        match self {
            Self::Detail => ColumnWidths {
                serial: 3.0,
                name: 7.5,
                label: 5.0,
                day: 8.0,
                summary: 10.0,
            },
            Self::Record => ColumnWidths {
                serial: 5.0,
                name: 10.0,
                label: 5.0,
                day: 4.0,
                summary: 10.0,
            },
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::Record => "record",
        }
    }
}

/// Value of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Inclusive cell rectangle, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl CellRange {
    pub fn new(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        Self {
            first_row: first_row as u32,
            first_col: first_col as u16,
            last_row: last_row as u32,
            last_col: last_col as u16,
        }
    }

    pub fn single(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn contains(&self, row: u32, col: u16) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }
}

/// Logical style regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStyle {
    Title,
    Header,
    Record,
    /// Anomalies: lateness, early leave, missing punches, short hours, absence.
    Flagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledRange {
    pub range: CellRange,
    pub style: CellStyle,
}

/// A tabulated report ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGrid {
    pub title: String,
    pub variant: ReportVariant,
    pub rows: Vec<Vec<CellValue>>,
    pub merges: Vec<CellRange>,
    /// Applied in order; later ranges override earlier ones.
    pub styles: Vec<StyledRange>,
    pub column_widths: Vec<f64>,
    /// Rows and columns kept visible when scrolling.
    pub freeze: (u32, u16),
}

impl ReportGrid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    /// Effective style of a cell.
    pub fn style_at(&self, row: u32, col: u16) -> CellStyle {
        self.styles
            .iter()
            .rev()
            .find(|s| s.range.contains(row, col))
            .map(|s| s.style)
            .unwrap_or(CellStyle::Record)
    }
}

/// Report title, also used as the sheet name.
pub fn report_title(period: &ReportPeriod) -> String {
    format!("Attendance {:04}-{:02}", period.year(), period.month())
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// One projected day cell.
struct DayCell {
    value: CellValue,
    flagged: bool,
}

impl DayCell {
    fn blank() -> Self {
        Self {
            value: CellValue::Empty,
            flagged: false,
        }
    }

    fn text(s: impl Into<String>, flagged: bool) -> Self {
        Self {
            value: CellValue::text(s),
            flagged,
        }
    }
}

/// Project a day into the rows of a user block, top to bottom.
fn project_day(status: &DayStatus, variant: ReportVariant) -> Vec<DayCell> {
    match status {
        DayStatus::RestDay => (0..variant.block_height()).map(|_| DayCell::blank()).collect(),
        DayStatus::Absent => {
            let mut cells = vec![
                DayCell::text(NO_CARD_SYMBOL, true),
                DayCell::text(NO_CARD_SYMBOL, true),
            ];
            cells.extend((2..variant.block_height()).map(|_| DayCell::blank()));
            cells
        }
        DayStatus::Present(day) => match variant {
            ReportVariant::Detail => project_detail(day),
            ReportVariant::Record => project_record(day),
        },
    }
}

fn project_detail(day: &PresentDay) -> Vec<DayCell> {
    let on_work = match day.on_work {
        Some(t) => DayCell::text(t.format("%H:%M:%S").to_string(), day.late),
        None => DayCell::text(NO_CARD_SYMBOL, true),
    };
    let off_work = match day.off_work {
        Some(t) => DayCell::text(t.format("%H:%M:%S").to_string(), day.early_leave),
        None => DayCell::text(NO_CARD_SYMBOL, true),
    };
    let hours = match day.work_hours() {
        Some(h) => DayCell::text(format!("{h:.1}"), day.short_duration),
        None => DayCell::text(UNKNOWN_DURATION_SYMBOL, false),
    };
    let flag = |set: bool| {
        if set {
            DayCell::text(FLAG_SYMBOL, true)
        } else {
            DayCell::blank()
        }
    };

    vec![on_work, off_work, hours, flag(day.late), flag(day.early_leave)]
}

fn project_record(day: &PresentDay) -> Vec<DayCell> {
    let symbol = |punched: bool, flagged: bool| {
        if punched {
            DayCell::text(CARD_SYMBOL, flagged)
        } else {
            DayCell::text(NO_CARD_SYMBOL, true)
        }
    };

    vec![
        symbol(day.on_work.is_some(), day.late),
        symbol(day.off_work.is_some(), day.early_leave),
    ]
}

/// Lay out a month of classified attendance.
pub fn tabulate(
    period: &ReportPeriod,
    calendar: &Calendar,
    users: &[UserAttendance],
    variant: ReportVariant,
) -> ReportGrid {
    let total_days = period.days_in_month() as usize;
    let summary_start = LEADING_COLUMNS + total_days;
    let width = summary_start + SUMMARY_COLUMNS;
    let height = variant.block_height();
    let title = report_title(period);

    let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(HEADER_ROWS + users.len() * height);
    let mut merges = Vec::new();
    let mut flagged = Vec::new();

    // Title
    let mut title_row = vec![CellValue::Empty; width];
    title_row[0] = CellValue::text(title.clone());
    rows.push(title_row);
    merges.push(CellRange::new(0, 0, 0, width - 1));

    // Header band
    let mut weekday_row = vec![CellValue::Empty; width];
    let mut date_row = vec![CellValue::Empty; width];
    weekday_row[0] = CellValue::text("No.");
    weekday_row[1] = CellValue::text("Name");
    weekday_row[2] = CellValue::text("Weekday");
    date_row[2] = CellValue::text("Date");
    for (offset, date) in period.dates().enumerate() {
        weekday_row[LEADING_COLUMNS + offset] = CellValue::text(weekday_label(date.weekday()));
        date_row[LEADING_COLUMNS + offset] = CellValue::Number(f64::from(date.day()));
    }
    weekday_row[summary_start] = CellValue::text(format!(
        "Summary ({} workdays)",
        calendar.workday_count(period)
    ));
    for (k, label) in SUMMARY_LABELS.iter().enumerate() {
        date_row[summary_start + k] = CellValue::text(*label);
    }
    rows.push(weekday_row);
    rows.push(date_row);
    merges.push(CellRange::new(1, 0, 2, 0));
    merges.push(CellRange::new(1, 1, 2, 1));
    merges.push(CellRange::new(1, summary_start, 1, width - 1));

    // User blocks
    for (index, user) in users.iter().enumerate() {
        let first_row = HEADER_ROWS + index * height;
        let mut block: Vec<Vec<CellValue>> = variant
            .row_labels()
            .iter()
            .map(|label| {
                let mut row = vec![CellValue::Empty; width];
                row[2] = CellValue::text(*label);
                row
            })
            .collect();

        block[0][0] = CellValue::Number((index + 1) as f64);
        block[0][1] = CellValue::text(user.display_name.clone());

        for (offset, day) in user.days.iter().take(total_days).enumerate() {
            let col = LEADING_COLUMNS + offset;
            for (r, cell) in project_day(&day.status, variant).into_iter().enumerate() {
                if cell.flagged {
                    flagged.push(CellRange::single(first_row + r, col));
                }
                block[r][col] = cell.value;
            }
        }

        for (k, count) in user.counters.as_array().into_iter().enumerate() {
            block[0][summary_start + k] = CellValue::Number(f64::from(count));
        }

        rows.extend(block);

        let last_row = first_row + height - 1;
        merges.push(CellRange::new(first_row, 0, last_row, 0));
        merges.push(CellRange::new(first_row, 1, last_row, 1));
        for k in 0..SUMMARY_COLUMNS {
            merges.push(CellRange::new(first_row, summary_start + k, last_row, summary_start + k));
        }
    }

    let last_row = rows.len() - 1;
    let mut styles = vec![
        StyledRange {
            range: CellRange::new(0, 0, last_row, width - 1),
            style: CellStyle::Record,
        },
        StyledRange {
            range: CellRange::new(1, 0, 2, width - 1),
            style: CellStyle::Header,
        },
        StyledRange {
            range: CellRange::new(0, 0, 0, width - 1),
            style: CellStyle::Title,
        },
    ];
    styles.extend(flagged.into_iter().map(|range| StyledRange {
        range,
        style: CellStyle::Flagged,
    }));

    let widths = variant.column_widths();
    let mut column_widths = vec![widths.serial, widths.name, widths.label];
    column_widths.extend(std::iter::repeat_n(widths.day, total_days));
    column_widths.extend(std::iter::repeat_n(widths.summary, SUMMARY_COLUMNS));

    ReportGrid {
        title,
        variant,
        rows,
        merges,
        styles,
        column_widths,
        freeze: (HEADER_ROWS as u32, LEADING_COLUMNS as u16),
    }
}
