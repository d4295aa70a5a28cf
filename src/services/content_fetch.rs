use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::core::config::Settings;

#[derive(Debug, Clone)]
pub(crate) struct FetchedContent {
    pub(crate) body: String,
    /// Whether the URL answered with a success status. A reachable but
    /// broken page is treated the same as an unreachable one.
    pub(crate) is_functional: bool,
}

#[async_trait]
pub(crate) trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedContent>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpContentFetcher {
    client: Client,
}

impl HttpContentFetcher {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.attempt().url_fetch_timeout))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedContent> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;

        let is_functional = response.status().is_success();
        let body = response.text().await.unwrap_or_default();

        Ok(FetchedContent { body, is_functional })
    }
}
