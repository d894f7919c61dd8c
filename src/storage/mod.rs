//! Report persistence.
//!
//! Reports are xlsx workbooks in a single output directory:
//!
//! ```text
//! {output_dir}/
//! ├── property_data_20250301_101500.xlsx
//! │   ├── Property_Data     # one row per listing
//! │   └── Summary           # Metric / Value
//! └── property_data_20250302_093012.xlsx
//! ```
//!
//! There is no manifest; reports are found by file name.

pub mod files;
pub mod report;

// Re-export for convenience
pub use files::{DeleteReport, ReportFile, ReportFilter, ReportOverview, delete, discover, inspect};
pub use report::{ReportWriter, report_columns, summary_rows};
