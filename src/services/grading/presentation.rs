use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::schemas::attempt::{PresentationResponse, ResponsePayload};
use crate::services::oracle_client::{GradingOracle, VideoEvaluationConfig};

use super::oracle::{oracle_request, outcome_from_verdict};
use super::{EffectiveQuestion, GradeOutcome, GradingContext, GradingError, GradingStrategy};

fn presentation_payload(
    response: &ResponsePayload,
) -> Result<&PresentationResponse, GradingError> {
    response.presentation.as_ref().ok_or_else(|| {
        GradingError::InvalidResponse(
            "presentation question requires a presentation response".to_string(),
        )
    })
}

fn normalized(presentation: &PresentationResponse) -> serde_json::Value {
    json!({
        "transcript": presentation.transcript,
        "duration_seconds": presentation.duration_seconds,
        "video_url": presentation.video_url,
    })
}

/// Live-recording uploads: the transcript carries what the oracle grades.
pub(crate) struct PresentationStrategy {
    oracle: Arc<dyn GradingOracle>,
}

impl PresentationStrategy {
    pub(crate) fn new(oracle: Arc<dyn GradingOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl GradingStrategy for PresentationStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let presentation = presentation_payload(response)?;
        if presentation.transcript.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(GradingError::InvalidResponse(
                "presentation response is missing a transcript".to_string(),
            ));
        }

        let request =
            oracle_request(question, ctx, presentation.transcript.clone().unwrap_or_default());
        let verdict = self
            .oracle
            .grade_presentation(request, presentation.clone())
            .await
            .map_err(|err| GradingError::Oracle(err.to_string()))?;

        Ok(outcome_from_verdict(question, verdict, normalized(presentation)))
    }
}

/// Recorded video presentations: the question's scoring block configures
/// which video dimensions the oracle evaluates.
pub(crate) struct VideoPresentationStrategy {
    oracle: Arc<dyn GradingOracle>,
}

impl VideoPresentationStrategy {
    pub(crate) fn new(oracle: Arc<dyn GradingOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl GradingStrategy for VideoPresentationStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let presentation = presentation_payload(response)?;
        if presentation.video_url.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(GradingError::InvalidResponse(
                "video presentation response is missing a video url".to_string(),
            ));
        }

        let video: VideoEvaluationConfig =
            serde_json::from_value(question.scoring.clone()).unwrap_or_default();

        let request = oracle_request(
            question,
            ctx,
            presentation.video_url.clone().unwrap_or_default(),
        );
        let verdict = self
            .oracle
            .grade_video_presentation(request, presentation.clone(), video)
            .await
            .map_err(|err| GradingError::Oracle(err.to_string()))?;

        Ok(outcome_from_verdict(question, verdict, normalized(presentation)))
    }
}
