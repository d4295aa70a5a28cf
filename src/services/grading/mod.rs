pub(crate) mod choice;
pub(crate) mod messages;
pub(crate) mod normalize;
pub(crate) mod oracle;
pub(crate) mod presentation;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::db::models::{Choice, FeedbackEntry, Question, QuestionVariant};
use crate::db::types::{QuestionType, ResponseSubtype};
use crate::schemas::attempt::{AuthorQuestionInput, ResponsePayload};
use crate::services::content_fetch::ContentFetcher;
use crate::services::oracle_client::GradingOracle;

/// The question as the learner saw it: variant fields override base fields,
/// with the per-attempt randomized choice order already applied.
#[derive(Debug, Clone)]
pub(crate) struct EffectiveQuestion {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) response_subtype: Option<ResponseSubtype>,
    pub(crate) choices: Vec<Choice>,
    pub(crate) scoring: serde_json::Value,
    pub(crate) total_points: f64,
    pub(crate) max_chars: Option<i32>,
    pub(crate) grading_context_question_ids: Vec<String>,
    pub(crate) answer: Option<String>,
}

impl EffectiveQuestion {
    pub(crate) fn from_base(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            text: question.text.clone(),
            question_type: question.question_type,
            response_subtype: question.response_subtype,
            choices: question.choices.0.clone(),
            scoring: question.scoring.0.clone(),
            total_points: question.total_points,
            max_chars: question.max_chars,
            grading_context_question_ids: question.grading_context_question_ids.0.clone(),
            answer: question.answer.clone(),
        }
    }

    /// Field-by-field fallback: the variant supplies what it overrides, the
    /// base question supplies the rest.
    pub(crate) fn from_variant(question: &Question, variant: &QuestionVariant) -> Self {
        Self {
            id: question.id.clone(),
            text: variant.text.clone(),
            question_type: question.question_type,
            response_subtype: question.response_subtype,
            choices: variant
                .choices
                .as_ref()
                .map(|choices| choices.0.clone())
                .unwrap_or_else(|| question.choices.0.clone()),
            scoring: variant
                .scoring
                .as_ref()
                .map(|scoring| scoring.0.clone())
                .unwrap_or_else(|| question.scoring.0.clone()),
            total_points: question.total_points,
            max_chars: variant.max_chars.or(question.max_chars),
            grading_context_question_ids: question.grading_context_question_ids.0.clone(),
            answer: variant.answer.clone().or_else(|| question.answer.clone()),
        }
    }

    pub(crate) fn from_author(input: &AuthorQuestionInput) -> Self {
        Self {
            id: input.id.clone(),
            text: input.text.clone(),
            question_type: input.question_type,
            response_subtype: input.response_subtype,
            choices: input.choices.clone(),
            scoring: input.scoring.clone(),
            total_points: input.total_points,
            max_chars: None,
            grading_context_question_ids: input.grading_context_question_ids.clone(),
            answer: input.answer.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ContextPair {
    pub(crate) question_text: String,
    pub(crate) answer_text: String,
}

#[derive(Debug, Clone)]
pub(crate) struct GradingContext {
    pub(crate) assignment_id: String,
    pub(crate) instructions: String,
    /// Base language subtag the learner answered in ("en" by default).
    pub(crate) language: String,
    pub(crate) prior_answers: Vec<ContextPair>,
}

#[derive(Debug, Clone)]
pub(crate) struct GradeOutcome {
    pub(crate) points: f64,
    pub(crate) feedback: Vec<FeedbackEntry>,
    pub(crate) normalized_response: serde_json::Value,
}

#[derive(Debug, Error)]
pub(crate) enum GradingError {
    #[error("{0}")]
    InvalidResponse(String),
    #[error("submitted url could not be fetched: {0}")]
    UnreachableUrl(String),
    #[error("no grading strategy registered for {0:?}")]
    UnknownType(QuestionType),
    #[error("grading oracle failure: {0}")]
    Oracle(String),
}

impl GradingError {
    /// Caller-correctable failures map to BadRequest; everything else is an
    /// internal grading failure.
    pub(crate) fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidResponse(_) | Self::UnreachableUrl(_))
    }
}

#[async_trait]
pub(crate) trait GradingStrategy: Send + Sync {
    async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError>;
}

type StrategyKey = (QuestionType, Option<ResponseSubtype>);

/// Routes one response to the strategy registered for the question's
/// (type, response sub-type) pair, falling back to the type's default
/// strategy when no sub-type-specific entry exists.
pub(crate) struct GradingDispatcher {
    strategies: HashMap<StrategyKey, Box<dyn GradingStrategy>>,
}

impl GradingDispatcher {
    pub(crate) fn new(oracle: Arc<dyn GradingOracle>, fetcher: Arc<dyn ContentFetcher>) -> Self {
        let mut strategies: HashMap<StrategyKey, Box<dyn GradingStrategy>> = HashMap::new();

        strategies.insert(
            (QuestionType::TrueFalse, None),
            Box::new(choice::TrueFalseStrategy),
        );
        strategies.insert(
            (QuestionType::SingleCorrect, None),
            Box::new(choice::SingleCorrectStrategy),
        );
        strategies.insert(
            (QuestionType::MultipleCorrect, None),
            Box::new(choice::MultipleCorrectStrategy),
        );
        strategies.insert(
            (QuestionType::Text, None),
            Box::new(oracle::TextStrategy::new(oracle.clone())),
        );
        strategies.insert(
            (QuestionType::Url, None),
            Box::new(oracle::UrlStrategy::new(oracle.clone(), fetcher)),
        );
        strategies.insert(
            (QuestionType::LinkFile, None),
            Box::new(oracle::FileStrategy::new(oracle.clone())),
        );
        strategies.insert(
            (QuestionType::Upload, None),
            Box::new(oracle::FileStrategy::new(oracle.clone())),
        );
        strategies.insert(
            (QuestionType::Upload, Some(ResponseSubtype::LiveRecording)),
            Box::new(presentation::PresentationStrategy::new(oracle.clone())),
        );
        strategies.insert(
            (QuestionType::Upload, Some(ResponseSubtype::Presentation)),
            Box::new(presentation::VideoPresentationStrategy::new(oracle)),
        );

        Self { strategies }
    }

    pub(crate) async fn grade(
        &self,
        question: &EffectiveQuestion,
        response: &ResponsePayload,
        ctx: &GradingContext,
    ) -> Result<GradeOutcome, GradingError> {
        if response.is_blank() {
            return Ok(GradeOutcome {
                points: 0.0,
                feedback: vec![FeedbackEntry {
                    message: messages::no_response(&ctx.language),
                    is_correct: Some(false),
                }],
                normalized_response: json!({}),
            });
        }

        let strategy = self
            .strategies
            .get(&(question.question_type, question.response_subtype))
            .or_else(|| self.strategies.get(&(question.question_type, None)))
            .ok_or(GradingError::UnknownType(question.question_type))?;

        strategy.grade(question, response, ctx).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::schemas::attempt::PresentationResponse;
    use crate::services::content_fetch::{ContentFetcher, FetchedContent};
    use crate::services::oracle_client::{
        GradingOracle, OracleRequest, OracleVerdict, VideoEvaluationConfig,
    };

    use super::*;

    /// Oracle double that records call counts and returns a fixed verdict.
    pub(crate) struct MockOracle {
        pub(crate) calls: AtomicUsize,
        pub(crate) verdict: OracleVerdict,
    }

    impl MockOracle {
        pub(crate) fn returning(points: f64) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                verdict: OracleVerdict { points, feedback: vec!["oracle feedback".to_string()] },
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> OracleVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            OracleVerdict {
                points: self.verdict.points,
                feedback: self.verdict.feedback.clone(),
            }
        }
    }

    #[async_trait]
    impl GradingOracle for MockOracle {
        async fn grade_text(&self, _req: OracleRequest) -> anyhow::Result<OracleVerdict> {
            Ok(self.record())
        }

        async fn grade_url(
            &self,
            _req: OracleRequest,
            _page_text: String,
        ) -> anyhow::Result<OracleVerdict> {
            Ok(self.record())
        }

        async fn grade_file(
            &self,
            _req: OracleRequest,
            _file_reference: String,
        ) -> anyhow::Result<OracleVerdict> {
            Ok(self.record())
        }

        async fn grade_presentation(
            &self,
            _req: OracleRequest,
            _presentation: PresentationResponse,
        ) -> anyhow::Result<OracleVerdict> {
            Ok(self.record())
        }

        async fn grade_video_presentation(
            &self,
            _req: OracleRequest,
            _presentation: PresentationResponse,
            _video: VideoEvaluationConfig,
        ) -> anyhow::Result<OracleVerdict> {
            Ok(self.record())
        }
    }

    pub(crate) struct MockFetcher {
        pub(crate) body: String,
        pub(crate) is_functional: bool,
    }

    #[async_trait]
    impl ContentFetcher for MockFetcher {
        async fn fetch(&self, _url: &str) -> anyhow::Result<FetchedContent> {
            Ok(FetchedContent { body: self.body.clone(), is_functional: self.is_functional })
        }
    }

    pub(crate) fn context() -> GradingContext {
        GradingContext {
            assignment_id: "assignment-1".to_string(),
            instructions: "Answer every question.".to_string(),
            language: "en".to_string(),
            prior_answers: Vec::new(),
        }
    }

    pub(crate) fn question(question_type: QuestionType, choices: Vec<Choice>) -> EffectiveQuestion {
        EffectiveQuestion {
            id: "question-1".to_string(),
            text: "What is the capital of France?".to_string(),
            question_type,
            response_subtype: None,
            choices,
            scoring: serde_json::json!({}),
            total_points: 10.0,
            max_chars: None,
            grading_context_question_ids: Vec::new(),
            answer: None,
        }
    }

    pub(crate) fn choice(id: &str, text: &str, is_correct: bool, points: f64) -> Choice {
        Choice {
            id: Some(id.to_string()),
            text: text.to_string(),
            is_correct,
            points,
            feedback: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::{context, question, MockFetcher, MockOracle};
    use super::*;

    fn dispatcher(oracle: Arc<MockOracle>) -> GradingDispatcher {
        let fetcher =
            Arc::new(MockFetcher { body: "page text".to_string(), is_functional: true });
        GradingDispatcher::new(oracle, fetcher)
    }

    #[tokio::test]
    async fn blank_response_short_circuits_without_oracle_call() {
        let oracle = MockOracle::returning(10.0);
        let dispatcher = dispatcher(oracle.clone());
        let question = question(QuestionType::Text, Vec::new());

        let payload = ResponsePayload { text: Some("   ".to_string()), ..Default::default() };
        let outcome = dispatcher.grade(&question, &payload, &context()).await.expect("outcome");

        assert_eq!(outcome.points, 0.0);
        assert_eq!(outcome.feedback.len(), 1);
        assert_eq!(outcome.feedback[0].message, messages::no_response("en"));
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn subtype_falls_back_to_type_default_strategy() {
        let oracle = MockOracle::returning(7.0);
        let dispatcher = dispatcher(oracle.clone());

        let mut question = question(QuestionType::Text, Vec::new());
        question.response_subtype = Some(ResponseSubtype::Code);

        let payload =
            ResponsePayload { text: Some("fn main() {}".to_string()), ..Default::default() };
        let outcome = dispatcher.grade(&question, &payload, &context()).await.expect("outcome");

        assert_eq!(outcome.points, 7.0);
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn presentation_subtype_uses_dedicated_strategy() {
        let oracle = MockOracle::returning(4.0);
        let dispatcher = dispatcher(oracle.clone());

        let mut question = question(QuestionType::Upload, Vec::new());
        question.response_subtype = Some(ResponseSubtype::LiveRecording);

        let payload = ResponsePayload {
            presentation: Some(crate::schemas::attempt::PresentationResponse {
                transcript: Some("hello".to_string()),
                slides: None,
                duration_seconds: Some(60.0),
                video_url: None,
            }),
            ..Default::default()
        };
        let outcome = dispatcher.grade(&question, &payload, &context()).await.expect("outcome");

        assert_eq!(outcome.points, 4.0);
        assert_eq!(oracle.call_count(), 1);
    }
}
