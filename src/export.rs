//! Excel rendering of tabulated reports.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;

use crate::error::Result;
use crate::models::ReportPeriod;
use crate::report::{CellRange, CellStyle, CellValue, ReportGrid, ReportVariant};

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Turns a report grid into a downloadable document.
pub trait ReportRenderer: Send + Sync + 'static {
    fn render(&self, grid: &ReportGrid) -> Result<Vec<u8>>;

    fn content_type(&self) -> &'static str;
}

/// Renders grids as a single-sheet `.xlsx` workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRenderer;

impl ReportRenderer for XlsxRenderer {
    fn render(&self, grid: &ReportGrid) -> Result<Vec<u8>> {
        let mut workbook = build_workbook(grid)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn content_type(&self) -> &'static str {
        XLSX_CONTENT_TYPE
    }
}

/// Download file name, e.g. `attendance_detail_202305.xlsx`.
pub fn report_filename(variant: ReportVariant, period: &ReportPeriod) -> String {
    format!("attendance_{}_{}.xlsx", variant.slug(), period.month_key())
}

struct Formats {
    title: Format,
    header: Format,
    record: Format,
    flagged: Format,
}

impl Formats {
    fn new() -> Self {
        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);

        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(18)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Medium),
            header: centered
                .clone()
                .set_bold()
                .set_text_wrap()
                .set_background_color(Color::RGB(0xD1E9E9)),
            flagged: centered.clone().set_font_color(Color::RGB(0xE60000)),
            record: centered,
        }
    }

    fn get(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Title => &self.title,
            CellStyle::Header => &self.header,
            CellStyle::Record => &self.record,
            CellStyle::Flagged => &self.flagged,
        }
    }
}

fn build_workbook(grid: &ReportGrid) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let formats = Formats::new();

    worksheet.set_name(&grid.title)?;

    for (col, width) in grid.column_widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }
    worksheet.set_row_height(0, 30)?;

    // Merged areas carry the value of their top-left cell.
    let mut covered = HashSet::new();
    for range in &grid.merges {
        write_merge(worksheet, grid, range, &formats)?;
        for row in range.first_row..=range.last_row {
            for col in range.first_col..=range.last_col {
                covered.insert((row, col));
            }
        }
    }

    for (r, cells) in grid.rows.iter().enumerate() {
        let row = r as u32;
        for (c, value) in cells.iter().enumerate() {
            let col = c as u16;
            if covered.contains(&(row, col)) {
                continue;
            }
            let format = formats.get(grid.style_at(row, col));
            write_cell(worksheet, row, col, value, format)?;
        }
    }

    worksheet.set_freeze_panes(grid.freeze.0, grid.freeze.1)?;

    Ok(workbook)
}

fn write_merge(
    worksheet: &mut Worksheet,
    grid: &ReportGrid,
    range: &CellRange,
    formats: &Formats,
) -> std::result::Result<(), XlsxError> {
    let format = formats.get(grid.style_at(range.first_row, range.first_col));
    let value = grid.cell(range.first_row as usize, range.first_col as usize);

    worksheet.merge_range(
        range.first_row,
        range.first_col,
        range.last_row,
        range.last_col,
        value.as_text().unwrap_or(""),
        format,
    )?;

    // merge_range only writes strings
    if let CellValue::Number(n) = value {
        worksheet.write_number_with_format(range.first_row, range.first_col, *n, format)?;
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: &Format,
) -> std::result::Result<(), XlsxError> {
    match value {
        CellValue::Empty => worksheet.write_blank(row, col, format)?,
        CellValue::Text(s) => worksheet.write_string_with_format(row, col, s, format)?,
        CellValue::Number(n) => worksheet.write_number_with_format(row, col, *n, format)?,
    };
    Ok(())
}
