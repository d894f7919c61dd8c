// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Something that can return the HTML body of a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url`; any non-2xx status is an error.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Live HTTP page source.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        log::debug!("GET {} -> {}", url, status);
        if !status.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source() -> HttpSource {
        HttpSource::from_config(&HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ul></ul>"))
            .mount(&server)
            .await;

        let body = source()
            .fetch_html(&format!("{}/search", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<ul></ul>");

        // The agent string contains commas, so compare the raw header value.
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let agent = requests[0]
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok());
        assert_eq!(agent, Some(HttpConfig::default().user_agent.as_str()));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source()
            .fetch_html(&format!("{}/search", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 503, .. }));
    }
}
