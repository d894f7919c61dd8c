// src/storage/files.rs

//! Discovery, inspection and removal of report files.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::{DateTime, Local};
use regex::Regex;

use crate::error::{AppError, Result};
use crate::storage::report::{DATA_SHEET, frequencies};

/// A report workbook found on disk.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub size_bytes: u64,
}

impl ReportFile {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Find `{prefix}_*.xlsx` files in `dir`, newest first.
///
/// A missing directory holds no reports.
pub fn discover(dir: &Path, prefix: &str) -> Result<Vec<ReportFile>> {
    let pattern = Regex::new(&format!(r"^{}_.*\.xlsx$", regex::escape(prefix)))
        .map_err(|e| AppError::config(format!("Invalid report prefix '{prefix}': {e}")))?;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if !pattern.is_match(&name.to_string_lossy()) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push(ReportFile {
            path: entry.path(),
            modified: DateTime::<Local>::from(metadata.modified()?),
            size_bytes: metadata.len(),
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    Ok(files)
}

/// Row restriction applied when inspecting a report.
///
/// An empty list matches everything; otherwise a row must match one entry
/// exactly.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub locations: Vec<String>,
    pub property_types: Vec<String>,
}

impl ReportFilter {
    fn accepts(&self, location: &str, property_type: &str) -> bool {
        let allowed =
            |list: &[String], value: &str| list.is_empty() || list.iter().any(|v| v == value);
        allowed(&self.locations, location) && allowed(&self.property_types, property_type)
    }
}

/// What a report contains, after filtering.
#[derive(Debug, Clone)]
pub struct ReportOverview {
    pub columns: Vec<String>,
    /// Data rows in the file
    pub total_rows: usize,
    /// Data rows passing the filter
    pub rows: Vec<Vec<String>>,
    pub pages: usize,
    pub with_details: usize,
    pub property_types: Vec<(String, usize)>,
    pub locations: Vec<(String, usize)>,
}

impl ReportOverview {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Mean rows per distinct page among the filtered rows.
    pub fn average_per_page(&self) -> f64 {
        if self.pages == 0 {
            0.0
        } else {
            self.rows.len() as f64 / self.pages as f64
        }
    }

    /// Value of `column` in a filtered row.
    pub fn cell<'r>(&'r self, row: &'r [String], column: &str) -> Option<&'r str> {
        let index = self.columns.iter().position(|c| c == column)?;
        row.get(index).map(String::as_str)
    }
}

/// Read a report's data sheet back.
pub fn inspect(path: &Path, filter: &ReportFilter) -> Result<ReportOverview> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook.worksheet_range(DATA_SHEET)?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let columns = rows
        .next()
        .ok_or_else(|| AppError::parse(path.display().to_string(), "report has no header row"))?;

    let position = |name: &str| columns.iter().position(|c| c == name);
    let (location_col, type_col) = (position("location"), position("property_type"));
    let (page_col, detail_col) = (position("page_number"), position("detailed_title"));
    let get = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    let all: Vec<Vec<String>> = rows.collect();
    let total_rows = all.len();
    let rows: Vec<Vec<String>> = all
        .into_iter()
        .filter(|row| filter.accepts(&get(row, location_col), &get(row, type_col)))
        .collect();

    let mut pages: Vec<String> = rows.iter().map(|row| get(row, page_col)).collect();
    pages.sort();
    pages.dedup();

    let with_details = rows
        .iter()
        .filter(|row| {
            let title = get(row, detail_col);
            !title.is_empty() && title != crate::models::NOT_AVAILABLE
        })
        .count();

    let table = |col: Option<usize>| -> Vec<(String, usize)> {
        let values: Vec<String> = rows.iter().map(|row| get(row, col)).collect();
        frequencies(values.iter().map(String::as_str))
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect()
    };
    let property_types = table(type_col);
    let locations = table(location_col);

    Ok(ReportOverview {
        columns,
        total_rows,
        pages: pages.len(),
        with_details,
        property_types,
        locations,
        rows,
    })
}

/// Cell text as the writer produced it; whole numbers print without a
/// fractional part.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Outcome of a batch delete.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Remove every file in `paths`, continuing past failures.
pub fn delete(paths: &[PathBuf]) -> DeleteReport {
    let mut report = DeleteReport::default();
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => report.deleted.push(path.clone()),
            Err(e) => {
                log::warn!("Failed to delete {}: {}", path.display(), e);
                report.failed.push((path.clone(), e.to_string()));
            }
        }
    }
    report
}
