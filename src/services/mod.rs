//! Service layer for the scraper.
//!
//! This module contains the scraping logic for:
//! - Listing card fields (`FieldExtractor`)
//! - Listing detail pages (`DetailFetcher`)
//! - Search result pages (`PageCrawler`)

mod details;
mod fields;
mod pages;
#[cfg(test)]
pub(crate) mod testing;

pub use details::DetailFetcher;
pub use fields::{FieldChain, FieldExtractor};
pub use pages::{ContainerFinder, PageCrawler, PageOutcome};
