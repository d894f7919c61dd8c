// src/services/testing.rs

//! In-memory page source for crawler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::utils::http::PageSource;

/// Serves canned HTML by exact URL; unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct FakeSource {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Every URL requested so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| AppError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// A PropertyFinder result page with `count` cards inside the desktop list.
pub(crate) fn pf_results_page(count: usize) -> String {
    let cards: String = (1..=count)
        .map(|i| {
            format!(
                r#"<li data-id="id-{i}">
                    <a data-testid="property-card-link" href="/en/plp/buy/land-{i}.html">
                      <h2>Plot {i}</h2>
                    </a>
                    <p data-testid="property-card-type">Land</p>
                    <p data-testid="property-card-price">{i},000 AED</p>
                   </li>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><ul class="styles_desktop_containerV85pq">{cards}</ul></body></html>"#
    )
}
