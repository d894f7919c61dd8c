// src/pipeline/scrape.rs

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Config, CrawlResult, format_duration};
use crate::storage::ReportWriter;
use crate::utils::http::PageSource;
use crate::utils::log::RunLog;

use super::crawl::run_crawler;

/// A finished run and the report it produced.
#[derive(Debug)]
pub struct ScrapeOutput {
    pub result: CrawlResult,
    pub report: PathBuf,
}

/// Crawl, then write the report.
///
/// A run that collects nothing fails with `AppError::NoData` after the crawl
/// summary has been logged; no file is created.
pub async fn run_scrape(
    config: &Config,
    source: &dyn PageSource,
    output: Option<&Path>,
    log: &RunLog,
) -> Result<ScrapeOutput> {
    log.step(1, 2, "Crawl - Fetching result pages");
    let result = run_crawler(&config.crawl, source, log).await?;

    log.summary(
        "Scraping completed",
        &[
            ("Total properties", result.records.len().to_string()),
            ("Pages visited", result.pages_visited.to_string()),
            (
                "Page range",
                format!("{}-{}", result.start_page, result.end_page),
            ),
            ("Stopped because", result.stop_reason.to_string()),
            ("Duration", format_duration(result.duration())),
            (
                "Average per page",
                format!("{:.1}", result.average_per_page()),
            ),
            ("With detailed data", result.detailed_count().to_string()),
        ],
    );

    log.step(2, 2, "Report - Writing spreadsheet");
    if result.records.is_empty() {
        log.warn("No properties were scraped");
    }
    let report = ReportWriter::new(&config.report).write(&result.records, output)?;
    log.success(&format!("Data saved to {}", report.display()));

    Ok(ScrapeOutput { result, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{CrawlConfig, ReportConfig};
    use crate::services::testing::{FakeSource, pf_results_page};

    fn config(dir: &Path) -> Config {
        Config {
            crawl: CrawlConfig {
                base_url: Some("https://www.propertyfinder.ae/en/search?page={page}".to_string()),
                max_pages: Some(2),
                page_delay_ms: 0,
                ..CrawlConfig::default()
            },
            report: ReportConfig {
                output_dir: dir.to_path_buf(),
                ..ReportConfig::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_scrape_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new()
            .with_page("https://www.propertyfinder.ae/en/search?page=1", &pf_results_page(2))
            .with_page("https://www.propertyfinder.ae/en/search?page=2", &pf_results_page(1));

        let output = run_scrape(&config(dir.path()), &source, None, &RunLog::sink())
            .await
            .unwrap();

        assert_eq!(output.result.records.len(), 3);
        assert!(output.report.exists());
        let name = output.report.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("property_data_") && name.ends_with(".xlsx"));
    }

    #[tokio::test]
    async fn test_scrape_without_records_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new();

        let result = run_scrape(&config(dir.path()), &source, None, &RunLog::sink()).await;

        assert!(matches!(result, Err(AppError::NoData)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
