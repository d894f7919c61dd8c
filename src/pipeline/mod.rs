//! Pipeline entry points for scraper operations.
//!
//! - `run_crawler`: Visit result pages until the stopping policy ends the run
//! - `run_scrape`: Crawl, then write the spreadsheet report

pub mod crawl;
pub mod scrape;

pub use crawl::{CrawlController, run_crawler};
pub use scrape::{ScrapeOutput, run_scrape};
