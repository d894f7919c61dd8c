// src/storage/report.rs

//! xlsx report writer.
//!
//! A report has two sheets: `Property_Data` with one row per listing and
//! `Summary` with run-level metrics derived from the rows.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::models::{
    BASE_COLUMNS, CellValue, DETAIL_COLUMNS, ListingRecord, NOT_AVAILABLE, ReportConfig,
};

pub const DATA_SHEET: &str = "Property_Data";
pub const SUMMARY_SHEET: &str = "Summary";

/// Longest string a worksheet cell accepts, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Writes crawl records to spreadsheet files.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    file_prefix: String,
    max_column_width: usize,
}

impl ReportWriter {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            file_prefix: config.file_prefix.clone(),
            max_column_width: config.max_column_width,
        }
    }

    /// `{output_dir}/{prefix}_{YYYYmmdd_HHMMSS}.xlsx`
    pub fn default_path(&self, at: DateTime<Local>) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.xlsx",
            self.file_prefix,
            at.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Write `records` to `path`, or to a timestamped default path.
    ///
    /// Fails with [`AppError::NoData`] without touching the filesystem when
    /// there is nothing to write.
    pub fn write(&self, records: &[ListingRecord], path: Option<&Path>) -> Result<PathBuf> {
        if records.is_empty() {
            return Err(AppError::NoData);
        }

        let now = Local::now();
        let path = path.map_or_else(|| self.default_path(now), Path::to_path_buf);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.data_sheet(records)?);
        workbook.push_worksheet(self.summary_sheet(&summary_rows(records, now))?);
        workbook.save(&path)?;

        log::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }

    fn data_sheet(&self, records: &[ListingRecord]) -> Result<Worksheet> {
        let columns = report_columns(records);
        let mut sheet = Worksheet::new();
        sheet.set_name(DATA_SHEET)?;

        let header = Format::new().set_bold();
        let mut widths = ColumnWidths::new(columns.len(), self.max_column_width);

        for (col, name) in columns.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, name.as_str(), &header)?;
            widths.observe(col, name);
        }

        for (row, record) in records.iter().enumerate() {
            let row = row as u32 + 1;
            for (col, name) in columns.iter().enumerate() {
                // Columns a record does not have stay blank.
                let Some(value) = record.value(name) else {
                    continue;
                };
                write_cell(&mut sheet, row, col as u16, &value)?;
                widths.observe(col, &value.to_string());
            }
        }

        widths.apply(&mut sheet)?;
        Ok(sheet)
    }

    fn summary_sheet(&self, rows: &[(&'static str, CellValue)]) -> Result<Worksheet> {
        let mut sheet = Worksheet::new();
        sheet.set_name(SUMMARY_SHEET)?;

        let header = Format::new().set_bold();
        let mut widths = ColumnWidths::new(2, self.max_column_width);

        for (col, name) in ["Metric", "Value"].into_iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, name, &header)?;
            widths.observe(col, name);
        }
        for (i, (metric, value)) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, *metric)?;
            write_cell(&mut sheet, row, 1, value)?;
            widths.observe(0, metric);
            widths.observe(1, &value.to_string());
        }

        widths.apply(&mut sheet)?;
        Ok(sheet)
    }
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<()> {
    match value {
        CellValue::Text(text) => sheet.write_string(row, col, clip_cell_text(text, row, col))?,
        CellValue::Number(n) => sheet.write_number(row, col, *n as f64)?,
    };
    Ok(())
}

/// Text beyond the cell limit is cut off rather than failing the report.
fn clip_cell_text(text: &str, row: u32, col: u16) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!("Cell at row {row}, column {col} truncated to {MAX_CELL_CHARS} characters");
            &text[..end]
        }
        None => text,
    }
}

/// Tracks the widest cell of each column in grapheme clusters.
struct ColumnWidths {
    widest: Vec<usize>,
    cap: usize,
}

impl ColumnWidths {
    fn new(columns: usize, cap: usize) -> Self {
        Self {
            widest: vec![0; columns],
            cap,
        }
    }

    fn observe(&mut self, col: usize, text: &str) {
        let width = text.graphemes(true).count();
        if let Some(widest) = self.widest.get_mut(col) {
            *widest = (*widest).max(width);
        }
    }

    fn width(&self, col: usize) -> usize {
        (self.widest[col] + 2).min(self.cap)
    }

    fn apply(&self, sheet: &mut Worksheet) -> Result<()> {
        for col in 0..self.widest.len() {
            sheet.set_column_width(col as u16, self.width(col) as f64)?;
        }
        Ok(())
    }
}

/// Report columns for a set of records.
///
/// Standard columns come first, then detail columns when any record has
/// details, then portal-specific columns in first-seen order.
pub fn report_columns(records: &[ListingRecord]) -> Vec<String> {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();

    if records.iter().any(ListingRecord::has_details) {
        columns.extend(DETAIL_COLUMNS.iter().map(|c| c.to_string()));
    }

    let mut seen: HashSet<String> = columns.iter().cloned().collect();
    for record in records {
        for (name, _) in &record.fields.extra {
            if seen.insert(name.clone()) {
                columns.push(name.clone());
            }
        }
    }
    columns
}

/// Metric rows of the summary sheet.
pub fn summary_rows(
    records: &[ListingRecord],
    at: DateTime<Local>,
) -> Vec<(&'static str, CellValue)> {
    let pages: HashSet<u32> = records.iter().map(|r| r.page_number).collect();
    let with_details = records.iter().filter(|r| r.has_details()).count();
    let with_images = records
        .iter()
        .filter(|r| r.fields.listing_image_count != NOT_AVAILABLE)
        .count();

    let common = |values: Vec<&str>| {
        CellValue::Text(most_common(values).unwrap_or(NOT_AVAILABLE).to_string())
    };

    vec![
        ("Total Properties Scraped", CellValue::Number(records.len() as u64)),
        ("Total Pages Scraped", CellValue::Number(pages.len() as u64)),
        ("Properties with Detailed Data", CellValue::Number(with_details as u64)),
        ("Properties with Images", CellValue::Number(with_images as u64)),
        (
            "Most Common Property Type",
            common(records.iter().map(|r| r.fields.property_type.as_str()).collect()),
        ),
        (
            "Most Common Location",
            common(records.iter().map(|r| r.fields.location.as_str()).collect()),
        ),
        (
            "Scrape Date",
            CellValue::Text(at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ),
    ]
}

/// Most frequent value; ties go to the value seen first.
pub fn most_common<'v>(values: impl IntoIterator<Item = &'v str>) -> Option<&'v str> {
    frequencies(values).into_iter().next().map(|(value, _)| value)
}

/// Value counts, most frequent first; ties keep first-seen order.
pub fn frequencies<'v>(values: impl IntoIterator<Item = &'v str>) -> Vec<(&'v str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use crate::models::{ListingDetails, ListingFields, ListingPosition};

    fn record(
        page: u32,
        index: u32,
        global: u64,
        property_type: &str,
        location: &str,
    ) -> ListingRecord {
        let fields = ListingFields {
            property_type: property_type.to_string(),
            location: location.to_string(),
            price: format!("{global},000 AED"),
            ..ListingFields::default()
        };
        let position = ListingPosition {
            page_number: page,
            index_on_page: index,
            global_index: global,
        };
        ListingRecord::new(fields, position, Local::now())
    }

    fn writer(dir: &Path) -> ReportWriter {
        ReportWriter::new(&ReportConfig {
            output_dir: dir.to_path_buf(),
            ..ReportConfig::default()
        })
    }

    fn as_text(cell: &Data) -> String {
        match cell {
            Data::Float(f) => (*f as i64).to_string(),
            Data::Int(i) => i.to_string(),
            Data::Empty => String::new(),
            other => other.to_string(),
        }
    }

    #[test]
    fn test_empty_records_are_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let result = writer(dir.path()).write(&[], None);

        assert!(matches!(result, Err(AppError::NoData)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_default_path_uses_prefix_and_timestamp() {
        let writer = writer(Path::new("out"));
        let at = Local::now();
        let expected = format!("property_data_{}.xlsx", at.format("%Y%m%d_%H%M%S"));
        assert_eq!(writer.default_path(at), Path::new("out").join(expected));
    }

    #[test]
    fn test_columns_follow_preferred_order() {
        let plain = record(1, 1, 1, "Land", "Dubai");
        let mut bayut = record(1, 2, 2, "Land", "Dubai");
        bayut.fields.extra = vec![
            ("latitude".to_string(), "25.1".to_string()),
            ("reference".to_string(), "Ref 1".to_string()),
        ];

        let columns = report_columns(&[plain.clone(), bayut.clone()]);
        assert_eq!(&columns[..18], &BASE_COLUMNS.map(String::from)[..]);
        assert_eq!(&columns[18..], &["latitude", "reference"]);

        let detailed = plain.with_details(ListingDetails {
            detailed_title: "T".to_string(),
            detailed_location: "L".to_string(),
            detailed_price: "P".to_string(),
            description: "D".to_string(),
            detailed_image_count: 1,
        });
        let columns = report_columns(&[detailed, bayut]);
        assert_eq!(columns[18], "detailed_title");
        assert_eq!(columns[22], "detailed_image_count");
        assert_eq!(columns[23], "latitude");
    }

    #[test]
    fn test_most_common_prefers_first_on_tie() {
        assert_eq!(most_common(["Dubai", "Sharjah", "Sharjah", "Dubai"]), Some("Dubai"));
        assert_eq!(most_common(["Dubai", "Sharjah", "Sharjah"]), Some("Sharjah"));
        assert_eq!(most_common(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_written_rows_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record(1, 1, 1, "Land", "Dubai South"),
            record(1, 2, 2, "Villa", "Al Furjan").with_details(ListingDetails {
                detailed_title: "Villa plot".to_string(),
                detailed_location: "Al Furjan, Dubai".to_string(),
                detailed_price: "2,000 AED".to_string(),
                description: "Corner".to_string(),
                detailed_image_count: 7,
            }),
            record(2, 1, 3, "Land", "Dubai South"),
        ];

        let path = writer(dir.path()).write(&records, None).unwrap();
        assert!(path.starts_with(dir.path()));

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let data = workbook.worksheet_range(DATA_SHEET).unwrap();
        let rows: Vec<Vec<String>> = data
            .rows()
            .map(|row| row.iter().map(as_text).collect())
            .collect();

        let columns = report_columns(&records);
        assert_eq!(rows[0], columns);
        assert_eq!(rows.len(), 4);

        for (record, row) in records.iter().zip(&rows[1..]) {
            for (name, cell) in columns.iter().zip(row) {
                let expected = record.value(name).map(|v| v.to_string()).unwrap_or_default();
                assert_eq!(cell, &expected, "column {name}");
            }
        }
        // No details on the first record leaves its detail cells blank.
        assert_eq!(rows[1][columns.iter().position(|c| c == "detailed_title").unwrap()], "");

        let summary = workbook.worksheet_range(SUMMARY_SHEET).unwrap();
        let summary: Vec<(String, String)> = summary
            .rows()
            .map(|row| (as_text(&row[0]), as_text(&row[1])))
            .collect();
        assert_eq!(summary[0], ("Metric".to_string(), "Value".to_string()));
        assert_eq!(summary[1], ("Total Properties Scraped".to_string(), "3".to_string()));
        assert_eq!(summary[2], ("Total Pages Scraped".to_string(), "2".to_string()));
        assert_eq!(summary[3], ("Properties with Detailed Data".to_string(), "1".to_string()));
        assert_eq!(summary[4], ("Properties with Images".to_string(), "0".to_string()));
        assert_eq!(summary[5].1, "Land");
        assert_eq!(summary[6].1, "Dubai South");
    }

    #[test]
    fn test_explicit_path_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports").join("run.xlsx");
        let records = vec![record(1, 1, 1, "Land", "Dubai")];

        let path = writer(dir.path()).write(&records, Some(&target)).unwrap();
        assert_eq!(path, target);
        assert!(target.exists());
    }

    #[test]
    fn test_oversized_text_is_clipped() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1, 1, 1, "Villa", "Dubai").with_details(ListingDetails {
            detailed_title: "Villa".to_string(),
            detailed_location: "Dubai".to_string(),
            detailed_price: "1 AED".to_string(),
            description: "a".repeat(40_000),
            detailed_image_count: 0,
        })];

        let path = writer(dir.path()).write(&records, None).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let data = workbook.worksheet_range(DATA_SHEET).unwrap();
        let columns = report_columns(&records);
        let col = columns.iter().position(|c| c == "description").unwrap();
        let description = as_text(data.get((1, col)).unwrap());
        assert_eq!(description.chars().count(), MAX_CELL_CHARS);

        assert_eq!(clip_cell_text("short", 1, 0), "short");
        let accented = "é".repeat(MAX_CELL_CHARS + 5);
        assert_eq!(clip_cell_text(&accented, 1, 0).chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn test_column_width_is_capped() {
        let mut widths = ColumnWidths::new(2, 10);
        widths.observe(0, "abc");
        widths.observe(1, &"x".repeat(40));
        widths.observe(0, "é");
        assert_eq!(widths.width(0), 5);
        assert_eq!(widths.width(1), 10);
    }
}
