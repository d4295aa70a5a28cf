use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config::Settings;
use crate::schemas::attempt::PresentationResponse;

const ORACLE_SYSTEM_PROMPT: &str = r#"You are an experienced instructor grading learner submissions.
Evaluate the learner's response against the question, the scoring guidance and the assignment instructions.
Award points between 0 and the stated maximum. Be consistent and explain the award.

Respond with strict JSON:
{
  "points": <number>,
  "feedback": ["short feedback line 1", "short feedback line 2"]
}

Write the feedback lines in the language named in the request."#;

/// Everything an oracle call needs about the question and the learner's
/// answer, already flattened from the attempt context.
#[derive(Debug, Clone)]
pub(crate) struct OracleRequest {
    pub(crate) question_text: String,
    pub(crate) instructions: String,
    /// Rendered prior question/answer pairs the question depends on.
    pub(crate) context: String,
    pub(crate) response_text: String,
    pub(crate) max_points: f64,
    pub(crate) scoring: Value,
    pub(crate) language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OracleVerdict {
    pub(crate) points: f64,
    #[serde(default)]
    pub(crate) feedback: Vec<String>,
}

/// Video-specific evaluation switches, read from the question's scoring
/// block. Absent keys disable the dimension.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VideoEvaluationConfig {
    #[serde(default)]
    pub(crate) evaluate_timing: bool,
    #[serde(default)]
    pub(crate) evaluate_slide_quality: bool,
}

#[async_trait]
pub(crate) trait GradingOracle: Send + Sync {
    async fn grade_text(&self, req: OracleRequest) -> Result<OracleVerdict>;

    async fn grade_url(&self, req: OracleRequest, page_text: String) -> Result<OracleVerdict>;

    async fn grade_file(&self, req: OracleRequest, file_reference: String)
        -> Result<OracleVerdict>;

    async fn grade_presentation(
        &self,
        req: OracleRequest,
        presentation: PresentationResponse,
    ) -> Result<OracleVerdict>;

    async fn grade_video_presentation(
        &self,
        req: OracleRequest,
        presentation: PresentationResponse,
        video: VideoEvaluationConfig,
    ) -> Result<OracleVerdict>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpGradingOracle {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl HttpGradingOracle {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.oracle().request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.oracle().api_key.clone(),
            base_url: settings.oracle().base_url.trim_end_matches('/').to_string(),
            model: settings.oracle().model.clone(),
            max_tokens: settings.oracle().max_tokens,
        })
    }

    fn base_prompt(req: &OracleRequest) -> String {
        format!(
            "Question:\n{}\n\nAssignment instructions:\n{}\n\nRelated prior answers:\n{}\n\nScoring guidance (maximum {} points):\n{}\n\nFeedback language: {}\n",
            req.question_text,
            req.instructions,
            if req.context.is_empty() { "(none)" } else { &req.context },
            req.max_points,
            serde_json::to_string_pretty(&req.scoring).unwrap_or_default(),
            req.language,
        )
    }

    async fn evaluate(&self, kind: &'static str, user_prompt: String) -> Result<OracleVerdict> {
        let timer = Instant::now();

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": ORACLE_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(kind, "Sending grading oracle request");

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=3 {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("Grading oracle API error: {body}"));
                }
                Err(err) => {
                    last_error =
                        Some(anyhow::anyhow!(err).context("Failed to call grading oracle"));
                }
            }

            if attempt < 3 {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt as u32))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing oracle response content")?;

        let verdict: OracleVerdict =
            serde_json::from_str(content).context("Failed to parse oracle verdict JSON")?;

        let elapsed = timer.elapsed().as_secs_f64();
        metrics::histogram!("gradeflow_oracle_request_duration_seconds").record(elapsed);
        tracing::info!(kind, duration_seconds = elapsed, "Grading oracle request completed");

        Ok(verdict)
    }
}

#[async_trait]
impl GradingOracle for HttpGradingOracle {
    async fn grade_text(&self, req: OracleRequest) -> Result<OracleVerdict> {
        let prompt = format!(
            "{}\nLearner's written answer:\n{}\n",
            Self::base_prompt(&req),
            req.response_text
        );
        self.evaluate("text", prompt).await
    }

    async fn grade_url(&self, req: OracleRequest, page_text: String) -> Result<OracleVerdict> {
        let prompt = format!(
            "{}\nSubmitted URL: {}\n\nRetrieved page content:\n{}\n",
            Self::base_prompt(&req),
            req.response_text,
            page_text
        );
        self.evaluate("url", prompt).await
    }

    async fn grade_file(
        &self,
        req: OracleRequest,
        file_reference: String,
    ) -> Result<OracleVerdict> {
        let prompt = format!(
            "{}\nSubmitted file reference: {file_reference}\n",
            Self::base_prompt(&req)
        );
        self.evaluate("file", prompt).await
    }

    async fn grade_presentation(
        &self,
        req: OracleRequest,
        presentation: PresentationResponse,
    ) -> Result<OracleVerdict> {
        let prompt = format!(
            "{}\nPresentation transcript:\n{}\n\nSlides:\n{}\n\nDuration (seconds): {}\n",
            Self::base_prompt(&req),
            presentation.transcript.unwrap_or_default(),
            serde_json::to_string_pretty(&presentation.slides.unwrap_or(Value::Null))
                .unwrap_or_default(),
            presentation.duration_seconds.unwrap_or_default(),
        );
        self.evaluate("presentation", prompt).await
    }

    async fn grade_video_presentation(
        &self,
        req: OracleRequest,
        presentation: PresentationResponse,
        video: VideoEvaluationConfig,
    ) -> Result<OracleVerdict> {
        let mut dimensions = Vec::new();
        if video.evaluate_timing {
            dimensions.push("pacing and timing");
        }
        if video.evaluate_slide_quality {
            dimensions.push("slide quality");
        }
        let prompt = format!(
            "{}\nRecorded presentation video: {}\n\nTranscript:\n{}\n\nAdditional dimensions to evaluate: {}\n",
            Self::base_prompt(&req),
            presentation.video_url.unwrap_or_default(),
            presentation.transcript.unwrap_or_default(),
            if dimensions.is_empty() { "none".to_string() } else { dimensions.join(", ") },
        );
        self.evaluate("video_presentation", prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_config_defaults_to_everything_off() {
        let config: VideoEvaluationConfig =
            serde_json::from_value(json!({ "rubrics": [] })).unwrap();
        assert!(!config.evaluate_timing);
        assert!(!config.evaluate_slide_quality);
    }

    #[test]
    fn verdict_parses_without_feedback() {
        let verdict: OracleVerdict = serde_json::from_str(r#"{"points": 4.5}"#).unwrap();
        assert_eq!(verdict.points, 4.5);
        assert!(verdict.feedback.is_empty());
    }
}
