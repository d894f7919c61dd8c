// src/models/mod.rs

//! Domain models for the scraper.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod listing;
mod portal;
pub mod selectors;

// Re-export all public types
pub use config::{Config, CrawlConfig, HttpConfig, LoggingConfig, ReportConfig};
pub use listing::{
    BASE_COLUMNS, CellValue, CrawlResult, DETAIL_COLUMNS, ListingDetails, ListingFields,
    ListingPosition, ListingRecord, NOT_AVAILABLE, StopReason, format_duration,
};
pub use portal::Portal;
