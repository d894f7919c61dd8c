// src/services/details.rs

//! Listing detail page fetcher.

use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::selectors::{DetailSelectors, bayut, property_finder};
use crate::models::{ListingDetails, NOT_AVAILABLE, Portal};
use crate::services::fields::parse_selector;
use crate::utils::http::PageSource;
use crate::utils::log::RunLog;
use crate::utils::normalize_whitespace;

/// Fetches a listing's own page and pulls a few secondary fields from it.
///
/// Detail pages are assumed to be more stable than search cards, so each
/// field has exactly one selector.
pub struct DetailFetcher<'a> {
    source: &'a dyn PageSource,
    log: &'a RunLog,
    title: Selector,
    location: Selector,
    description: Selector,
    price: Selector,
    images: Selector,
    image_host: &'static str,
}

impl<'a> DetailFetcher<'a> {
    pub fn new(portal: Portal, source: &'a dyn PageSource, log: &'a RunLog) -> Result<Self> {
        let selectors: DetailSelectors = match portal {
            Portal::PropertyFinder => property_finder::DETAIL,
            Portal::Bayut => bayut::DETAIL,
        };

        Ok(Self {
            source,
            log,
            title: parse_selector(selectors.title)?,
            location: parse_selector(selectors.location)?,
            description: parse_selector(selectors.description)?,
            price: parse_selector(selectors.price)?,
            images: parse_selector("img[src]")?,
            image_host: portal.image_host(),
        })
    }

    /// Fetch detail data for one listing.
    ///
    /// Returns `None` on any failure; callers treat that as "no detail
    /// data", never as a fatal error.
    pub async fn fetch_details(&self, url: &str) -> Option<ListingDetails> {
        self.log.debug(&format!("Collecting detailed data from: {url}"));

        match self.source.fetch_html(url).await {
            Ok(html) => {
                let details = self.parse(&html);
                self.log.debug(&format!(
                    "Collected detailed data for: {}",
                    details.detailed_title
                ));
                Some(details)
            }
            Err(e) => {
                self.log
                    .warn(&format!("Error collecting detail data from {url}: {e}"));
                None
            }
        }
    }

    fn parse(&self, html: &str) -> ListingDetails {
        let document = Html::parse_document(html);
        let text_of = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .map(|el| normalize_whitespace(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };

        // Images are counted, never downloaded or recorded.
        let detailed_image_count = document
            .select(&self.images)
            .filter_map(|img| img.value().attr("src"))
            .filter(|src| src.contains(self.image_host))
            .count() as u64;

        ListingDetails {
            detailed_title: text_of(&self.title),
            detailed_location: text_of(&self.location),
            detailed_price: text_of(&self.price),
            description: text_of(&self.description),
            detailed_image_count,
        }
    }
}
