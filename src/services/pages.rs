// src/services/pages.rs

//! Search result page crawler.

use std::time::Duration;

use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::selectors::{
    ClassMatch, ContainerKind, ContainerStrategy, bayut, property_finder,
};
use crate::models::{
    CrawlConfig, ListingFields, ListingPosition, ListingRecord, NOT_AVAILABLE, Portal,
};
use crate::services::details::DetailFetcher;
use crate::services::fields::{FieldExtractor, parse_selector};
use crate::utils::http::PageSource;
use crate::utils::log::RunLog;

/// What a single result page yielded.
#[derive(Debug)]
pub enum PageOutcome {
    /// A container strategy matched
    Listings {
        strategy: &'static str,
        records: Vec<ListingRecord>,
        /// Cards that could not be read as listings
        skipped: usize,
    },
    /// No container strategy matched anything
    NoContainer,
    /// The page could not be fetched
    FetchFailed { reason: String },
}

impl PageOutcome {
    /// Records produced; zero for every variant but `Listings`.
    pub fn count(&self) -> usize {
        match self {
            PageOutcome::Listings { records, .. } => records.len(),
            _ => 0,
        }
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        match self {
            PageOutcome::Listings { records, .. } => records,
            _ => Vec::new(),
        }
    }
}

struct CompiledStrategy {
    name: &'static str,
    selector: Selector,
    class: Option<ClassMatch>,
    kind: ContainerKind,
}

/// Ordered container strategies; the first one that matches anything wins.
pub struct ContainerFinder {
    strategies: Vec<CompiledStrategy>,
    items: Selector,
}

impl ContainerFinder {
    pub fn new(strategies: &[ContainerStrategy]) -> Result<Self> {
        let strategies = strategies
            .iter()
            .map(|s| {
                Ok(CompiledStrategy {
                    name: s.name,
                    selector: parse_selector(s.selector)?,
                    class: s.class,
                    kind: s.kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            strategies,
            items: parse_selector("li")?,
        })
    }

    pub fn for_portal(portal: Portal) -> Result<Self> {
        match portal {
            Portal::PropertyFinder => Self::new(property_finder::CONTAINERS),
            Portal::Bayut => Self::new(bayut::CONTAINERS),
        }
    }

    /// Locate listing nodes, returning the winning strategy's name.
    ///
    /// A wrapper that matches ends the search even when it holds no items.
    pub fn locate<'d>(&self, document: &'d Html) -> Option<(&'static str, Vec<ElementRef<'d>>)> {
        for strategy in &self.strategies {
            let mut candidates = document.select(&strategy.selector).filter(|el| {
                strategy
                    .class
                    .is_none_or(|class| class.matches(el.value().attr("class").unwrap_or("")))
            });

            match strategy.kind {
                ContainerKind::Wrapper => {
                    if let Some(wrapper) = candidates.next() {
                        return Some((strategy.name, wrapper.select(&self.items).collect()));
                    }
                }
                ContainerKind::Items => {
                    let nodes: Vec<_> = candidates.collect();
                    if !nodes.is_empty() {
                        return Some((strategy.name, nodes));
                    }
                }
            }
        }
        None
    }
}

/// Fetches one result page and turns its cards into records.
pub struct PageCrawler<'a> {
    source: &'a dyn PageSource,
    log: &'a RunLog,
    containers: ContainerFinder,
    fields: FieldExtractor,
    details: Option<DetailFetcher<'a>>,
    detail_delay: Duration,
}

impl<'a> PageCrawler<'a> {
    pub fn new(config: &CrawlConfig, source: &'a dyn PageSource, log: &'a RunLog) -> Result<Self> {
        let details = if config.collect_details {
            Some(DetailFetcher::new(config.portal, source, log)?)
        } else {
            None
        };

        Ok(Self {
            source,
            log,
            containers: ContainerFinder::for_portal(config.portal)?,
            fields: FieldExtractor::for_portal(config.portal)?,
            details,
            detail_delay: config.detail_delay(),
        })
    }

    /// Crawl a single result page.
    ///
    /// Transport failures and unmatched layouts are outcomes, not errors;
    /// only a malformed page URL is returned as `Err`.
    pub async fn crawl_page(
        &self,
        url: &str,
        page_number: u32,
        next_global_index: u64,
    ) -> Result<PageOutcome> {
        let url = Url::parse(url)?;
        self.log.info(&format!("Scraping page {page_number}: {url}"));

        let html = match self.source.fetch_html(url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                self.log.error(&format!("Error scraping page {page_number}: {e}"));
                return Ok(PageOutcome::FetchFailed {
                    reason: e.to_string(),
                });
            }
        };

        let Some((strategy, cards)) = self.extract_cards(&html) else {
            self.log
                .warn(&format!("No property listings found on page {page_number}"));
            return Ok(PageOutcome::NoContainer);
        };

        self.log.info(&format!(
            "Found {} property listings on page {} (strategy: {})",
            cards.len(),
            page_number,
            strategy
        ));

        let mut records = Vec::with_capacity(cards.len());
        let mut skipped = 0;

        for (i, card) in cards.into_iter().enumerate() {
            let index_on_page = i as u32 + 1;
            let fields = match card {
                Ok(fields) => fields,
                Err(e) => {
                    skipped += 1;
                    self.log.error(&format!(
                        "Error processing property {index_on_page} on page {page_number}: {e}"
                    ));
                    continue;
                }
            };

            let position = ListingPosition {
                page_number,
                index_on_page,
                global_index: next_global_index + records.len() as u64,
            };
            let record = ListingRecord::new(fields, position, Local::now());
            records.push(self.attach_details(record).await);
        }

        self.log.info(&format!(
            "Successfully processed {} properties from page {}",
            records.len(),
            page_number
        ));

        Ok(PageOutcome::Listings {
            strategy,
            records,
            skipped,
        })
    }

    /// Parse the page and read every card; the document is dropped before
    /// any detail request goes out.
    fn extract_cards(&self, html: &str) -> Option<(&'static str, Vec<Result<ListingFields>>)> {
        let document = Html::parse_document(html);
        let (strategy, nodes) = self.containers.locate(&document)?;
        let cards = nodes
            .into_iter()
            .map(|node| self.fields.extract(node))
            .collect();
        Some((strategy, cards))
    }

    async fn attach_details(&self, record: ListingRecord) -> ListingRecord {
        let Some(fetcher) = &self.details else {
            return record;
        };
        if record.fields.property_url == NOT_AVAILABLE {
            return record;
        }

        let details = fetcher.fetch_details(&record.fields.property_url).await;
        tokio::time::sleep(self.detail_delay).await;

        match details {
            Some(details) => record.with_details(details),
            None => record,
        }
    }
}
