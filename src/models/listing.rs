// src/models/listing.rs

//! Listing records and crawl results.

use std::fmt;

use chrono::{DateTime, Local};

/// Placeholder for a field whose element could not be located.
pub const NOT_AVAILABLE: &str = "N/A";

/// Columns every record carries, in report order.
pub const BASE_COLUMNS: [&str; 18] = [
    "scrape_date",
    "page_number",
    "property_index_on_page",
    "global_property_index",
    "property_id",
    "title",
    "property_type",
    "price",
    "location",
    "area",
    "bedrooms",
    "bathrooms",
    "listing_status",
    "is_new",
    "listed_time",
    "phone",
    "property_url",
    "listing_image_count",
];

/// Columns contributed by the detail page.
pub const DETAIL_COLUMNS: [&str; 5] = [
    "detailed_title",
    "detailed_location",
    "detailed_price",
    "description",
    "detailed_image_count",
];

/// A single spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Number(u64),
}

impl CellValue {
    fn text(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Fields scraped from one listing card, before it is placed in the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingFields {
    /// Portal-assigned identifier, when the card carries one
    pub source_id: Option<String>,
    pub property_type: String,
    pub price: String,
    pub title: String,
    pub location: String,
    pub area: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub listing_status: String,
    pub is_new: String,
    pub listed_time: String,
    pub phone: String,
    pub listing_image_count: String,
    pub property_url: String,
    /// Portal-specific fields, reported after the standard columns
    pub extra: Vec<(String, String)>,
}

impl Default for ListingFields {
    fn default() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            source_id: None,
            property_type: na(),
            price: na(),
            title: na(),
            location: na(),
            area: na(),
            bedrooms: na(),
            bathrooms: na(),
            listing_status: na(),
            is_new: na(),
            listed_time: na(),
            phone: na(),
            listing_image_count: na(),
            property_url: na(),
            extra: Vec::new(),
        }
    }
}

/// Where a listing sits within the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingPosition {
    pub page_number: u32,
    /// 1-based position of the card on its page
    pub index_on_page: u32,
    /// 1-based position across the whole run
    pub global_index: u64,
}

/// Fields taken from a listing's own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingDetails {
    pub detailed_title: String,
    pub detailed_location: String,
    pub detailed_price: String,
    pub description: String,
    /// Number of portal-hosted images on the page
    pub detailed_image_count: u64,
}

/// One scraped property.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub scrape_date: String,
    pub page_number: u32,
    pub property_index_on_page: u32,
    pub global_property_index: u64,
    pub property_id: String,
    pub fields: ListingFields,
    pub details: Option<ListingDetails>,
}

impl ListingRecord {
    /// Place scraped fields in the run.
    ///
    /// Cards without a portal identifier get `prop_p{page}_{index}`.
    pub fn new(
        fields: ListingFields,
        position: ListingPosition,
        scraped_at: DateTime<Local>,
    ) -> Self {
        let property_id = fields.source_id.clone().unwrap_or_else(|| {
            format!("prop_p{}_{}", position.page_number, position.index_on_page)
        });

        Self {
            scrape_date: scraped_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            page_number: position.page_number,
            property_index_on_page: position.index_on_page,
            global_property_index: position.global_index,
            property_id,
            fields,
            details: None,
        }
    }

    /// Attach detail-page data.
    pub fn with_details(mut self, details: ListingDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Value of a report column, `None` when the record has no such column.
    pub fn value(&self, column: &str) -> Option<CellValue> {
        let f = &self.fields;
        let value = match column {
            "scrape_date" => CellValue::text(&self.scrape_date),
            "page_number" => CellValue::Number(u64::from(self.page_number)),
            "property_index_on_page" => CellValue::Number(u64::from(self.property_index_on_page)),
            "global_property_index" => CellValue::Number(self.global_property_index),
            "property_id" => CellValue::text(&self.property_id),
            "title" => CellValue::text(&f.title),
            "property_type" => CellValue::text(&f.property_type),
            "price" => CellValue::text(&f.price),
            "location" => CellValue::text(&f.location),
            "area" => CellValue::text(&f.area),
            "bedrooms" => CellValue::text(&f.bedrooms),
            "bathrooms" => CellValue::text(&f.bathrooms),
            "listing_status" => CellValue::text(&f.listing_status),
            "is_new" => CellValue::text(&f.is_new),
            "listed_time" => CellValue::text(&f.listed_time),
            "phone" => CellValue::text(&f.phone),
            "property_url" => CellValue::text(&f.property_url),
            "listing_image_count" => CellValue::text(&f.listing_image_count),
            _ => return self.detail_value(column).or_else(|| self.extra_value(column)),
        };
        Some(value)
    }

    fn detail_value(&self, column: &str) -> Option<CellValue> {
        let d = self.details.as_ref()?;
        let value = match column {
            "detailed_title" => CellValue::text(&d.detailed_title),
            "detailed_location" => CellValue::text(&d.detailed_location),
            "detailed_price" => CellValue::text(&d.detailed_price),
            "description" => CellValue::text(&d.description),
            "detailed_image_count" => CellValue::Number(d.detailed_image_count),
            _ => return None,
        };
        Some(value)
    }

    fn extra_value(&self, column: &str) -> Option<CellValue> {
        self.fields
            .extra
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| CellValue::text(value))
    }

    pub fn has_details(&self) -> bool {
        self.details.is_some()
    }
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured page limit was reached
    PageLimit,
    /// This many empty pages were seen in a row
    EmptyPages(u32),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PageLimit => f.write_str("page limit reached"),
            StopReason::EmptyPages(n) => write!(f, "{n} consecutive empty pages"),
        }
    }
}

/// Everything a finished crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub records: Vec<ListingRecord>,
    pub start_page: u32,
    /// Last page visited
    pub end_page: u32,
    pub pages_visited: u32,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub stop_reason: StopReason,
}

impl CrawlResult {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Mean records per page that produced at least one record.
    pub fn average_per_page(&self) -> f64 {
        let mut pages: Vec<u32> = self.records.iter().map(|r| r.page_number).collect();
        pages.dedup();
        if pages.is_empty() {
            0.0
        } else {
            self.records.len() as f64 / pages.len() as f64
        }
    }

    pub fn detailed_count(&self) -> usize {
        self.records.iter().filter(|r| r.has_details()).count()
    }
}

/// Format a duration as `1h 2m 3s`, or `2m 3s` under an hour.
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(page: u32, index: u32, global: u64) -> ListingPosition {
        ListingPosition {
            page_number: page,
            index_on_page: index,
            global_index: global,
        }
    }

    #[test]
    fn test_synthesized_property_id() {
        let record = ListingRecord::new(ListingFields::default(), position(3, 7, 40), Local::now());
        assert_eq!(record.property_id, "prop_p3_7");

        let fields = ListingFields {
            source_id: Some("12345".to_string()),
            ..ListingFields::default()
        };
        let record = ListingRecord::new(fields, position(3, 7, 40), Local::now());
        assert_eq!(record.property_id, "12345");
    }

    #[test]
    fn test_every_base_column_has_a_value() {
        let record = ListingRecord::new(ListingFields::default(), position(1, 1, 1), Local::now());
        for column in BASE_COLUMNS {
            assert!(record.value(column).is_some(), "missing {column}");
        }
        assert_eq!(record.value("price"), Some(CellValue::Text("N/A".to_string())));
        assert_eq!(record.value("global_property_index"), Some(CellValue::Number(1)));
    }

    #[test]
    fn test_detail_and_extra_columns() {
        let fields = ListingFields {
            extra: vec![("latitude".to_string(), "25.2".to_string())],
            ..ListingFields::default()
        };
        let record = ListingRecord::new(fields, position(1, 1, 1), Local::now());
        assert_eq!(record.value("detailed_title"), None);
        assert_eq!(record.value("latitude"), Some(CellValue::Text("25.2".to_string())));

        let record = record.with_details(ListingDetails {
            detailed_title: "Plot".to_string(),
            detailed_location: "Dubai".to_string(),
            detailed_price: "1,000 AED".to_string(),
            description: "Corner plot".to_string(),
            detailed_image_count: 4,
        });
        assert_eq!(record.value("detailed_image_count"), Some(CellValue::Number(4)));
        assert!(record.has_details());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(75)), "1m 15s");
        assert_eq!(format_duration(chrono::Duration::seconds(3725)), "1h 2m 5s");
    }
}
