use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::core::config::Settings;

/// Reports the best grade for an assignment back to the calling platform.
/// Failures here must never undo an already-persisted submission.
#[async_trait]
pub(crate) trait GradeRecorder: Send + Sync {
    async fn notify(&self, grade: f64, outcome_token: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpGradeRecorder {
    client: Client,
    url: String,
}

impl HttpGradeRecorder {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.callback().request_timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url: settings.callback().grade_recorder_url.clone() })
    }
}

#[async_trait]
impl GradeRecorder for HttpGradeRecorder {
    async fn notify(&self, grade: f64, outcome_token: &str) -> Result<()> {
        let response = self
            .client
            .put(&self.url)
            .bearer_auth(outcome_token)
            .json(&json!({ "score": grade }))
            .send()
            .await
            .context("Failed to call grade recorder")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Grade recorder rejected the update: {status} {body}");
        }

        tracing::info!(grade, "Grade recorded via callback");
        Ok(())
    }
}
