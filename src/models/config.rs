//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Portal;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Pagination and stopping policy
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Spreadsheet output settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Console log settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Write this configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        self.crawl.validate()?;
        if self.report.file_prefix.trim().is_empty() {
            return Err(AppError::validation("report.file_prefix is empty"));
        }
        if self.report.max_column_width == 0 {
            return Err(AppError::validation(
                "report.max_column_width must be > 0",
            ));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Parameters of a single crawl run.
///
/// A run never mutates its configuration; overrides from the command line
/// are applied before the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Which portal's markup to expect
    #[serde(default)]
    pub portal: Portal,

    /// Search URL template; `{page}` is replaced with the page number.
    /// Falls back to the portal's default search when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// First page number to fetch
    #[serde(default = "defaults::start_page")]
    pub start_page: u32,

    /// Number of pages to fetch; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    /// Fetch each listing's own page for detail fields
    #[serde(default)]
    pub collect_details: bool,

    /// Stop after `max_consecutive_empty` empty pages in a row
    #[serde(default = "defaults::enabled")]
    pub auto_detect_end: bool,

    /// Pause between page fetches in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Pause after each detail fetch in milliseconds
    #[serde(default = "defaults::detail_delay")]
    pub detail_delay_ms: u64,

    /// Consecutive empty pages that end an auto-detecting run
    #[serde(default = "defaults::max_consecutive_empty")]
    pub max_consecutive_empty: u32,

    /// Emit a progress line on page numbers divisible by N
    #[serde(default = "defaults::progress_every")]
    pub progress_every: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            portal: Portal::default(),
            base_url: None,
            start_page: defaults::start_page(),
            max_pages: None,
            collect_details: false,
            auto_detect_end: defaults::enabled(),
            page_delay_ms: defaults::page_delay(),
            detail_delay_ms: defaults::detail_delay(),
            max_consecutive_empty: defaults::max_consecutive_empty(),
            progress_every: defaults::progress_every(),
        }
    }
}

impl CrawlConfig {
    /// The search URL template in effect for this run.
    pub fn url_template(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.portal.default_search_url())
    }

    /// Build the URL of a result page.
    ///
    /// Templates without a `{page}` placeholder get a `page` query parameter.
    pub fn page_url(&self, page: u32) -> String {
        let template = self.url_template();
        if template.contains("{page}") {
            return template.replace("{page}", &page.to_string());
        }
        let separator = if template.contains('?') { '&' } else { '?' };
        format!("{template}{separator}page={page}")
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    /// Last page this run may visit, if bounded.
    pub fn end_page(&self) -> Option<u32> {
        self.max_pages
            .map(|max| self.start_page.saturating_add(max).saturating_sub(1))
    }

    fn validate(&self) -> Result<()> {
        if self.start_page == 0 {
            return Err(AppError::validation("crawl.start_page must be >= 1"));
        }
        if self.max_pages == Some(0) {
            return Err(AppError::validation(
                "crawl.max_pages must be > 0 (omit it for unlimited)",
            ));
        }
        if self.max_consecutive_empty == 0 {
            return Err(AppError::validation(
                "crawl.max_consecutive_empty must be > 0",
            ));
        }
        if self.progress_every == 0 {
            return Err(AppError::validation("crawl.progress_every must be > 0"));
        }
        url::Url::parse(&self.page_url(self.start_page))?;
        Ok(())
    }
}

/// Spreadsheet output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory where reports are written and discovered
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    /// Report file names are `{file_prefix}_{timestamp}.xlsx`
    #[serde(default = "defaults::file_prefix")]
    pub file_prefix: String,

    /// Upper bound for auto-sized column widths
    #[serde(default = "defaults::max_column_width")]
    pub max_column_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
            file_prefix: defaults::file_prefix(),
            max_column_width: defaults::max_column_width(),
        }
    }
}

/// Console log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn or error
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Crawl defaults
    pub fn start_page() -> u32 {
        1
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn page_delay() -> u64 {
        1500
    }
    pub fn detail_delay() -> u64 {
        500
    }
    pub fn max_consecutive_empty() -> u32 {
        3
    }
    pub fn progress_every() -> u32 {
        10
    }

    // Report defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from(".")
    }
    pub fn file_prefix() -> String {
        "property_data".into()
    }
    pub fn max_column_width() -> usize {
        50
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_limit() {
        let mut config = Config::default();
        config.crawl.max_pages = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unparsable_base_url() {
        let mut config = Config::default();
        config.crawl.base_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn page_url_appends_query_parameter() {
        let config = CrawlConfig {
            base_url: Some("https://example.com/search?c=1".to_string()),
            ..CrawlConfig::default()
        };
        assert_eq!(config.page_url(4), "https://example.com/search?c=1&page=4");

        let bare = CrawlConfig {
            base_url: Some("https://example.com/search".to_string()),
            ..CrawlConfig::default()
        };
        assert_eq!(bare.page_url(2), "https://example.com/search?page=2");
    }

    #[test]
    fn page_url_fills_placeholder() {
        let config = CrawlConfig {
            base_url: Some("https://example.com/uae/page-{page}/".to_string()),
            ..CrawlConfig::default()
        };
        assert_eq!(config.page_url(7), "https://example.com/uae/page-7/");
    }

    #[test]
    fn end_page_is_inclusive() {
        let config = CrawlConfig {
            start_page: 5,
            max_pages: Some(3),
            ..CrawlConfig::default()
        };
        assert_eq!(config.end_page(), Some(7));
        assert_eq!(CrawlConfig::default().end_page(), None);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawl]
            portal = "bayut"
            max_pages = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.crawl.portal, Portal::Bayut);
        assert_eq!(config.crawl.max_pages, Some(2));
        assert_eq!(config.crawl.page_delay_ms, 1500);
        assert!(config.crawl.auto_detect_end);
        assert_eq!(config.report.file_prefix, "property_data");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.crawl.max_pages = Some(12);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.crawl.max_pages, Some(12));
        assert_eq!(loaded.http.user_agent, config.http.user_agent);
    }
}
