use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::db::models::FeedbackEntry;
use crate::schemas::attempt::ResponsePayload;
use crate::services::content_fetch::ContentFetcher;
use crate::services::oracle_client::{GradingOracle, OracleRequest, OracleVerdict};

use super::{EffectiveQuestion, GradeOutcome, GradingContext, GradingError, GradingStrategy};

/// Builds the oracle request shared by every delegating strategy. Prior
/// answers are rendered into a plain-text context block.
pub(super) fn oracle_request(
    question: &EffectiveQuestion,
    ctx: &GradingContext,
    response_text: String,
) -> OracleRequest {
    let context = ctx
        .prior_answers
        .iter()
        .map(|pair| format!("Q: {}\nA: {}", pair.question_text, pair.answer_text))
        .collect::<Vec<_>>()
        .join("\n\n");

    OracleRequest {
        question_text: question.text.clone(),
        instructions: ctx.instructions.clone(),
        context,
        response_text,
        max_points: question.total_points,
        scoring: question.scoring.clone(),
        language: ctx.language.clone(),
    }
}

/// Converts an oracle verdict into a grade outcome, clamping the awarded
/// points into `[0, total_points]`.
pub(super) fn outcome_from_verdict(
    question: &EffectiveQuestion,
    verdict: OracleVerdict,
    normalized_response: serde_json::Value,
) -> GradeOutcome {
    GradeOutcome {
        points: verdict.points.clamp(0.0, question.total_points.max(0.0)),
        feedback: verdict
            .feedback
            .into_iter()
            .map(|message| FeedbackEntry { message, is_correct: None })
            .collect(),
        normalized_response,
    }
}

pub(crate) struct TextStrategy {
    oracle: Arc<dyn GradingOracle>,
}

impl TextStrategy {
    pub(crate) fn new(oracle: Arc<dyn GradingOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl GradingStrategy for TextStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let text = response
            .text
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GradingError::InvalidResponse("text question requires a text response".to_string())
            })?;

        // Anything past the authored character limit is not graded.
        let text: String = match question.max_chars {
            Some(limit) if limit > 0 => text.chars().take(limit as usize).collect(),
            _ => text.to_string(),
        };

        let verdict = self
            .oracle
            .grade_text(oracle_request(question, ctx, text.clone()))
            .await
            .map_err(|err| GradingError::Oracle(err.to_string()))?;

        Ok(outcome_from_verdict(question, verdict, json!({ "text": text })))
    }
}

pub(crate) struct UrlStrategy {
    oracle: Arc<dyn GradingOracle>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl UrlStrategy {
    pub(crate) fn new(oracle: Arc<dyn GradingOracle>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { oracle, fetcher }
    }
}

#[async_trait]
impl GradingStrategy for UrlStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let url = response
            .url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GradingError::InvalidResponse("url question requires a url response".to_string())
            })?;

        let fetched = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|err| GradingError::UnreachableUrl(format!("{url}: {err}")))?;
        if !fetched.is_functional {
            return Err(GradingError::UnreachableUrl(url.to_string()));
        }

        let verdict = self
            .oracle
            .grade_url(oracle_request(question, ctx, url.to_string()), fetched.body)
            .await
            .map_err(|err| GradingError::Oracle(err.to_string()))?;

        Ok(outcome_from_verdict(question, verdict, json!({ "url": url })))
    }
}

/// Grades uploaded artifacts and linked files alike: both arrive as a
/// reference the oracle can retrieve.
pub(crate) struct FileStrategy {
    oracle: Arc<dyn GradingOracle>,
}

impl FileStrategy {
    pub(crate) fn new(oracle: Arc<dyn GradingOracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl GradingStrategy for FileStrategy {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        let file_url = response
            .file_url
            .as_deref()
            .or(response.url.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GradingError::InvalidResponse(
                    "file question requires a file reference".to_string(),
                )
            })?;

        let verdict = self
            .oracle
            .grade_file(oracle_request(question, ctx, file_url.to_string()), file_url.to_string())
            .await
            .map_err(|err| GradingError::Oracle(err.to_string()))?;

        Ok(outcome_from_verdict(question, verdict, json!({ "file_url": file_url })))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::types::QuestionType;
    use crate::services::grading::testing::{context, question, MockFetcher, MockOracle};

    use super::*;

    #[tokio::test]
    async fn text_strategy_clamps_oracle_points_to_question_total() {
        let oracle = MockOracle::returning(25.0);
        let strategy = TextStrategy::new(oracle.clone());
        let question = question(QuestionType::Text, Vec::new());
        let payload =
            ResponsePayload { text: Some("an essay".to_string()), ..Default::default() };

        let outcome = strategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 10.0);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn text_strategy_truncates_to_max_chars() {
        let oracle = MockOracle::returning(5.0);
        let strategy = TextStrategy::new(oracle.clone());
        let mut question = question(QuestionType::Text, Vec::new());
        question.max_chars = Some(4);
        let payload =
            ResponsePayload { text: Some("abcdefgh".to_string()), ..Default::default() };

        let outcome = strategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.normalized_response["text"], "abcd");
    }

    #[tokio::test]
    async fn text_strategy_without_text_is_caller_error() {
        let oracle = MockOracle::returning(5.0);
        let strategy = TextStrategy::new(oracle.clone());
        let question = question(QuestionType::Text, Vec::new());
        let payload =
            ResponsePayload { url: Some("https://a.example".to_string()), ..Default::default() };

        let error = strategy.grade(&question, &payload, &context()).await.expect_err("error");
        assert!(error.is_caller_error());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn url_strategy_rejects_non_functional_page() {
        let oracle = MockOracle::returning(5.0);
        let fetcher =
            Arc::new(MockFetcher { body: String::new(), is_functional: false });
        let strategy = UrlStrategy::new(oracle.clone(), fetcher);
        let question = question(QuestionType::Url, Vec::new());
        let payload =
            ResponsePayload { url: Some("https://down.example".to_string()), ..Default::default() };

        let error = strategy.grade(&question, &payload, &context()).await.expect_err("error");
        assert!(matches!(error, GradingError::UnreachableUrl(_)));
        assert!(error.is_caller_error());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn url_strategy_passes_fetched_page_to_oracle() {
        let oracle = MockOracle::returning(8.0);
        let fetcher =
            Arc::new(MockFetcher { body: "<html>ok</html>".to_string(), is_functional: true });
        let strategy = UrlStrategy::new(oracle.clone(), fetcher);
        let question = question(QuestionType::Url, Vec::new());
        let payload =
            ResponsePayload { url: Some("https://up.example".to_string()), ..Default::default() };

        let outcome = strategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 8.0);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn file_strategy_accepts_url_field_as_fallback_reference() {
        let oracle = MockOracle::returning(3.0);
        let strategy = FileStrategy::new(oracle.clone());
        let question = question(QuestionType::LinkFile, Vec::new());
        let payload = ResponsePayload {
            url: Some("https://files.example/report.pdf".to_string()),
            ..Default::default()
        };

        let outcome = strategy.grade(&question, &payload, &context()).await.expect("outcome");
        assert_eq!(outcome.points, 3.0);
        assert_eq!(outcome.normalized_response["file_url"], "https://files.example/report.pdf");
    }
}
