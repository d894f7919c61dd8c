// src/pipeline/crawl.rs

//! Multi-page crawl with its stopping policy.

use chrono::Local;

use crate::error::Result;
use crate::models::{CrawlConfig, CrawlResult, ListingRecord, StopReason};
use crate::services::{PageCrawler, PageOutcome};
use crate::utils::http::PageSource;
use crate::utils::log::RunLog;

/// Progress of a run between pages.
#[derive(Debug)]
struct CrawlState {
    page: u32,
    pages_visited: u32,
    empty_streak: u32,
    records: Vec<ListingRecord>,
}

impl CrawlState {
    fn new(start_page: u32) -> Self {
        Self {
            page: start_page,
            pages_visited: 0,
            empty_streak: 0,
            records: Vec::new(),
        }
    }

    /// Global index the next appended record receives.
    fn next_global_index(&self) -> u64 {
        self.records.len() as u64 + 1
    }

    /// Account for the page just visited and move to the next one.
    fn complete_page(&mut self, records: Vec<ListingRecord>) {
        if records.is_empty() {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
        }
        self.records.extend(records);
        self.pages_visited += 1;
        self.page = self.page.saturating_add(1);
    }

    fn stop_reason(&self, config: &CrawlConfig) -> Option<StopReason> {
        if config.auto_detect_end && self.empty_streak >= config.max_consecutive_empty {
            return Some(StopReason::EmptyPages(self.empty_streak));
        }
        match config.max_pages {
            Some(max) if self.pages_visited >= max => Some(StopReason::PageLimit),
            _ => None,
        }
    }
}

/// Drives a [`PageCrawler`] across consecutive result pages.
pub struct CrawlController<'a> {
    config: &'a CrawlConfig,
    crawler: PageCrawler<'a>,
    log: &'a RunLog,
}

impl<'a> CrawlController<'a> {
    pub fn new(
        config: &'a CrawlConfig,
        source: &'a dyn PageSource,
        log: &'a RunLog,
    ) -> Result<Self> {
        Ok(Self {
            config,
            crawler: PageCrawler::new(config, source, log)?,
            log,
        })
    }

    /// Crawl until the page limit or the empty-page threshold is reached.
    ///
    /// Page failures never end the run; they count as empty pages.
    pub async fn run(&self) -> CrawlResult {
        let config = self.config;
        let started_at = Local::now();
        let mut state = CrawlState::new(config.start_page);

        if config.max_pages.is_none() && !config.auto_detect_end {
            self.log
                .warn("No page limit and end detection disabled; the crawl only stops when killed");
        }

        let stop_reason = loop {
            if let Some(reason) = state.stop_reason(config) {
                break reason;
            }
            if state.pages_visited > 0 {
                tokio::time::sleep(config.page_delay()).await;
            }

            let page = state.page;
            let url = config.page_url(page);

            let records = match self
                .crawler
                .crawl_page(&url, page, state.next_global_index())
                .await
            {
                Ok(outcome) => {
                    self.log_outcome(page, &outcome);
                    outcome.into_records()
                }
                Err(e) => {
                    self.log.error(&format!("Error on page {page}: {e}"));
                    Vec::new()
                }
            };
            state.complete_page(records);

            if state.empty_streak > 0 && config.auto_detect_end {
                self.log.info(&format!(
                    "Empty page {page} ({}/{} consecutive)",
                    state.empty_streak, config.max_consecutive_empty
                ));
            }

            if page % config.progress_every.max(1) == 0 {
                self.log.info(&format!(
                    "Progress: page {page}, {} pages visited, {} properties collected",
                    state.pages_visited,
                    state.records.len()
                ));
            }
        };

        let end_page = state.page.saturating_sub(1);
        self.log.info(&format!(
            "Crawl stopped after page {end_page}: {stop_reason}"
        ));

        CrawlResult {
            records: state.records,
            start_page: config.start_page,
            end_page,
            pages_visited: state.pages_visited,
            started_at,
            finished_at: Local::now(),
            stop_reason,
        }
    }

    fn log_outcome(&self, page: u32, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Listings {
                strategy, skipped, ..
            } if *skipped > 0 => self.log.warn(&format!(
                "Page {page} ({strategy}): {} listings kept, {skipped} skipped",
                outcome.count()
            )),
            PageOutcome::Listings { .. } => {}
            PageOutcome::NoContainer => {
                self.log.debug(&format!("Page {page}: no listing container"))
            }
            PageOutcome::FetchFailed { reason } => {
                self.log.debug(&format!("Page {page}: fetch failed ({reason})"))
            }
        }
    }
}

/// Run a crawl with the configured settings.
pub async fn run_crawler(
    config: &CrawlConfig,
    source: &dyn PageSource,
    log: &RunLog,
) -> Result<CrawlResult> {
    log.header(&format!("{} scraper starting", config.portal.name()));
    log.summary(
        "Run settings",
        &[
            ("Search URL", config.url_template().to_string()),
            ("Start page", config.start_page.to_string()),
            (
                "Page limit",
                config
                    .max_pages
                    .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
            ),
            ("Detailed data", yes_no(config.collect_details)),
            ("Auto-detect end", yes_no(config.auto_detect_end)),
        ],
    );

    let controller = CrawlController::new(config, source, log)?;
    let result = controller.run().await;

    log.success(&format!(
        "Scraped {} properties from {} pages",
        result.records.len(),
        result.pages_visited
    ));
    Ok(result)
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
